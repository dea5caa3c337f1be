//! Control Builder
//!
//! One node of the build tree. A builder knows the type it will create, the
//! property, bound and event entries its attributes resolved to, and its
//! ordered children (literal text and nested builders). Specialised kinds
//! (templates, collections, string properties, code blocks, data-bound
//! literals, object tags) share the node and differ in how they accept
//! content.

use super::collection::CollectionData;
use super::property_entry::{
    collapse_into, BoundPropertyEntry, ComplexPropertyEntry, EntryHeader, EventEntry,
    SimplePropertyEntry, TemplatePropertyEntry,
};
use super::template::TemplateData;
use super::BuildContext;
use super::{CodeBlockData, ObjectTagData};
use crate::error::{ErrorCode, ParseError, Result};
use crate::expressions::{local_resources_for, ExpressionContext};
use crate::markup::patterns::{
    BIND_EXPRESSION, BIND_ITEM_EXPRESSION, BIND_ITEM_PARAMETERS, BIND_PARAMETERS, DATABIND_VALUE,
    EXPRESSION_BUILDER_VALUE, FORMAT_STRING,
};
use crate::markup::{parse_property_device_filter, CodeBlockType, ParsedAttribute, ParsedAttributeCollection};
use crate::parse_util::{html_decode, is_whitespace_string, SourceLocation};
use crate::schema::{convert_value, get_member_info, MemberInfo, PropertyValue, TypeFlags, TypeId, ValueKind};
use crate::virtual_path::VirtualPath;
use bitflags::bitflags;
use serde::Serialize;

/// Builder specialisation
#[derive(Debug, Clone, Serialize)]
pub enum BuilderKind {
    /// The document itself
    Root,
    Control,
    Template(TemplateData),
    Collection(CollectionData),
    /// A nested element whose text becomes a string property
    StringProperty,
    CodeBlock(CodeBlockData),
    DataBoundLiteral,
    ObjectTag(ObjectTagData),
    /// Unknown content dropped by a parent that ignores it
    Ignored,
}

/// A child of a builder, in document order
#[derive(Debug, Clone, Serialize)]
pub enum SubBuilder {
    Literal(String),
    Builder(Box<ControlBuilder>),
}

/// The member a property builder (`<HeaderStyle>`, `<ItemTemplate>`) sets on its parent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyTarget {
    pub name: String,
    pub filter: String,
    pub declaring_type: Option<String>,
    pub member_type: Option<String>,
    pub read_only: bool,
}

/// How a parent that handles its child tags resolved one of them
#[derive(Debug)]
pub enum ChildBuilder {
    Created(ControlBuilder),
    /// Unknown content the parent ignores
    Dropped,
    /// The parent leaves resolution to the tag registry
    Default,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct BuilderFlags: u16 {
        const CHILDREN_AS_PROPERTIES = 1 << 0;
        const IGNORE_UNKNOWN_CONTENT = 1 << 1;
        const NO_WHITESPACE_LITERALS = 1 << 2;
        const HTML_DECODE_LITERALS = 1 << 3;
        const NEEDS_INNER_TEXT = 1 << 4;
        const IS_CONTROL = 1 << 5;
        const ATTRIBUTE_ACCESSOR = 1 << 6;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlBuilder {
    pub kind: BuilderKind,
    #[serde(skip)]
    pub control_type: Option<TypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub tag_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filter: String,
    #[serde(skip_serializing_if = "ParsedAttributeCollection::is_empty")]
    pub attributes: ParsedAttributeCollection,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_builders: Vec<SubBuilder>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub simple_properties: Vec<SimplePropertyEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub complex_properties: Vec<ComplexPropertyEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub template_properties: Vec<TemplatePropertyEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bound_properties: Vec<BoundPropertyEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyTarget>,
    /// Source of a user control
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_control: Option<VirtualPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    pub in_designer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_key: Option<String>,
    pub localize: bool,
    pub closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_text: Option<String>,
    #[serde(skip)]
    flags: BuilderFlags,
    #[serde(skip)]
    default_property_builder: Option<Box<ControlBuilder>>,
    #[serde(skip)]
    next_index: usize,
}

fn attribute_location(ctx: &BuildContext, attr: &ParsedAttribute) -> Option<SourceLocation> {
    (attr.line > 0).then(|| SourceLocation::new(ctx.virtual_path.clone(), attr.line, attr.column))
}

fn located(err: ParseError, location: &Option<SourceLocation>) -> ParseError {
    match location {
        Some(loc) => err.or_location(loc),
        None => err,
    }
}

impl ControlBuilder {
    pub fn new(kind: BuilderKind, tag_name: &str) -> Self {
        ControlBuilder {
            kind,
            control_type: None,
            type_name: None,
            tag_name: tag_name.to_string(),
            id: None,
            filter: String::new(),
            attributes: ParsedAttributeCollection::new(),
            sub_builders: Vec::new(),
            simple_properties: Vec::new(),
            complex_properties: Vec::new(),
            template_properties: Vec::new(),
            bound_properties: Vec::new(),
            events: Vec::new(),
            property: None,
            user_control: None,
            location: None,
            in_designer: false,
            skin_id: None,
            resource_key: None,
            localize: true,
            closed: false,
            inner_text: None,
            flags: BuilderFlags::empty(),
            default_property_builder: None,
            next_index: 0,
        }
    }

    /// The document root, typed as the document's base type
    pub fn root(ctx: &BuildContext, base_type: TypeId) -> ControlBuilder {
        let mut builder = ControlBuilder::new(BuilderKind::Root, "");
        builder.set_root_type(ctx, base_type);
        builder.in_designer = ctx.in_designer;
        builder
    }

    /// Rebind the root to the type named by `Inherits`
    pub(crate) fn set_root_type(&mut self, ctx: &BuildContext, base_type: TypeId) {
        self.bind_type(ctx, base_type);
        self.flags.insert(BuilderFlags::IS_CONTROL);
        self.flags.remove(BuilderFlags::CHILDREN_AS_PROPERTIES | BuilderFlags::NEEDS_INNER_TEXT);
    }

    /// A server control (or collection item) resolved to `control_type`
    pub fn for_control(
        ctx: &BuildContext,
        control_type: TypeId,
        tag_name: &str,
        attributes: &ParsedAttributeCollection,
        location: Option<SourceLocation>,
    ) -> Result<ControlBuilder> {
        let mut builder = ControlBuilder::new(BuilderKind::Control, tag_name);
        builder.init(ctx, control_type, attributes, location)?;
        Ok(builder)
    }

    pub fn ignored(tag_name: &str, location: Option<SourceLocation>) -> ControlBuilder {
        let mut builder = ControlBuilder::new(BuilderKind::Ignored, tag_name);
        builder.location = location;
        builder
    }

    fn bind_type(&mut self, ctx: &BuildContext, control_type: TypeId) {
        let registry = ctx.registry;
        self.control_type = Some(control_type);
        self.type_name = Some(registry.full_name(control_type).to_string());
        let is_control = registry.is_control(control_type);
        let inner_text = registry.inner_text_property(control_type).is_some();
        let mut flags = BuilderFlags::empty();
        flags.set(BuilderFlags::IS_CONTROL, is_control);
        flags.set(BuilderFlags::NEEDS_INNER_TEXT, inner_text);
        flags.set(
            BuilderFlags::CHILDREN_AS_PROPERTIES,
            registry.inherits_flag(control_type, TypeFlags::CHILDREN_AS_PROPERTIES) || (!is_control && !inner_text),
        );
        flags.set(
            BuilderFlags::IGNORE_UNKNOWN_CONTENT,
            registry.inherits_flag(control_type, TypeFlags::IGNORE_UNKNOWN_CONTENT),
        );
        flags.set(
            BuilderFlags::NO_WHITESPACE_LITERALS,
            registry.inherits_flag(control_type, TypeFlags::NO_WHITESPACE_LITERALS),
        );
        flags.set(
            BuilderFlags::HTML_DECODE_LITERALS,
            registry.inherits_flag(control_type, TypeFlags::HTML_DECODE_LITERALS),
        );
        flags.set(
            BuilderFlags::ATTRIBUTE_ACCESSOR,
            registry.is_a(control_type, "System.Web.UI.IAttributeAccessor"),
        );
        self.flags = flags;
    }

    /// Bind the builder to its type and resolve its attributes
    pub fn init(
        &mut self,
        ctx: &BuildContext,
        control_type: TypeId,
        attributes: &ParsedAttributeCollection,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        self.bind_type(ctx, control_type);
        self.location = location.clone();
        self.in_designer = ctx.in_designer;
        self.attributes = attributes.clone();
        self.process_attributes(ctx, attributes)?;

        if self.flags.contains(BuilderFlags::CHILDREN_AS_PROPERTIES) {
            if let Some(name) = ctx.registry.default_property(control_type).map(str::to_string) {
                if let Some(info) = get_member_info(ctx.registry, control_type, &name)? {
                    let builder = self.create_property_builder(
                        ctx,
                        &info,
                        "",
                        &name,
                        &ParsedAttributeCollection::new(),
                        location,
                    )?;
                    self.default_property_builder = Some(Box::new(builder));
                }
            }
        }
        Ok(())
    }

    pub fn is_control(&self) -> bool {
        self.flags.contains(BuilderFlags::IS_CONTROL)
    }

    pub fn children_as_properties(&self) -> bool {
        self.flags.contains(BuilderFlags::CHILDREN_AS_PROPERTIES)
    }

    pub fn needs_tag_inner_text(&self) -> bool {
        self.flags.contains(BuilderFlags::NEEDS_INNER_TEXT)
    }

    pub fn is_template(&self) -> bool {
        matches!(self.kind, BuilderKind::Template(_))
    }

    pub fn template_data(&self) -> Option<&TemplateData> {
        match &self.kind {
            BuilderKind::Template(data) => Some(data),
            _ => None,
        }
    }

    /// Nested tags are literal markup: string properties and inner-text controls
    pub fn takes_raw_content(&self) -> bool {
        matches!(self.kind, BuilderKind::StringProperty) || self.needs_tag_inner_text()
    }

    /// Whether child elements are resolved by this builder instead of the tag registry
    pub fn handles_child_tags(&self) -> bool {
        match self.kind {
            BuilderKind::Ignored | BuilderKind::Collection(_) => true,
            BuilderKind::Control => self.children_as_properties(),
            _ => false,
        }
    }

    fn next_index(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    fn type_display(&self) -> &str {
        self.type_name.as_deref().unwrap_or(&self.tag_name)
    }

    fn header_for(
        &mut self,
        ctx: &BuildContext,
        filter: &str,
        name: &str,
        info: Option<&MemberInfo>,
        location: Option<SourceLocation>,
    ) -> EntryHeader {
        let mut header = EntryHeader::new(filter, name).with_location(location);
        if let Some(info) = info {
            header.name = info.canonical_name.clone();
            header.declaring_type = Some(ctx.registry.full_name(info.member.declaring_type).to_string());
            header.member_type = Some(ctx.registry.full_name(info.member_type()).to_string());
            header.read_only = !info.member.writable;
        }
        header.index = self.next_index();
        header
    }

    // Attributes

    fn process_attributes(&mut self, ctx: &BuildContext, attributes: &ParsedAttributeCollection) -> Result<()> {
        self.process_meta_attributes(ctx, attributes)?;

        for (filter, _) in attributes.filtered_groups() {
            if filter.is_empty() || filter.eq_ignore_ascii_case("meta") {
                continue;
            }
            if !ctx.filter_resolution.is_known_filter(&filter) {
                return Err(ParseError::new(
                    ErrorCode::InvalidDeviceFilter,
                    format!("The device filter '{}' is not defined.", filter),
                ));
            }
        }

        for attr in attributes.iter() {
            if attr.filter.eq_ignore_ascii_case("meta") {
                continue;
            }
            let location = attribute_location(ctx, attr);
            self.process_attribute(ctx, attr, location.clone())
                .map_err(|e| located(e, &location))?;
        }

        self.add_implicit_resources(ctx);

        let id = self.id.clone();
        for entry in &mut self.bound_properties {
            if !entry.is_databinding() {
                continue;
            }
            if entry.two_way_bound && id.is_none() {
                return Err(located(
                    ParseError::new(
                        ErrorCode::TwoWayBindingRequiresId,
                        format!(
                            "A control of type '{}' must have an ID when it uses two-way databinding on '{}'.",
                            self.type_name.as_deref().unwrap_or(&self.tag_name),
                            entry.header.name
                        ),
                    ),
                    &entry.header.location,
                ));
            }
            if ctx.no_compile() && id.is_none() {
                return Err(located(
                    ParseError::new(
                        ErrorCode::NoCompileBindingRequiresId,
                        format!(
                            "A control with databinding on '{}' must have an ID when the compilation mode is Never.",
                            entry.header.name
                        ),
                    ),
                    &entry.header.location,
                ));
            }
            entry.control_id = id.clone();
        }
        Ok(())
    }

    fn process_meta_attributes(&mut self, ctx: &BuildContext, attributes: &ParsedAttributeCollection) -> Result<()> {
        let mut localize_set = None;
        for attr in attributes.iter().filter(|a| a.filter.eq_ignore_ascii_case("meta")) {
            let location = attribute_location(ctx, attr);
            if ctx.in_theme() {
                return Err(located(
                    ParseError::new(
                        ErrorCode::MetaLocalizeNotAllowed,
                        format!("The 'meta:{}' attribute is not allowed in a theme.", attr.name),
                    ),
                    &location,
                ));
            }
            match attr.name.to_ascii_lowercase().as_str() {
                "resourcekey" => self.resource_key = Some(attr.value.trim().to_string()),
                "localize" => {
                    let value = attr.value.trim();
                    let localize = if value.eq_ignore_ascii_case("true") {
                        true
                    } else if value.eq_ignore_ascii_case("false") {
                        false
                    } else {
                        return Err(located(
                            ParseError::new(
                                ErrorCode::InvalidLocalizeValue,
                                format!("'{}' is not a valid value for 'meta:localize'; use 'true' or 'false'.", value),
                            ),
                            &location,
                        ));
                    };
                    localize_set = Some(localize);
                }
                other => {
                    return Err(located(
                        ParseError::new(
                            ErrorCode::TypeDoesntHaveProperty,
                            format!("The attribute 'meta:{}' is not recognized.", other),
                        ),
                        &location,
                    ))
                }
            }
        }
        if let Some(localize) = localize_set {
            self.localize = localize;
        }
        if self.resource_key.is_some() && !self.localize {
            return Err(ParseError::new(
                ErrorCode::ResourceKeyWithLocalizeFalse,
                "'meta:resourcekey' cannot be used when 'meta:localize' is false.",
            ));
        }
        Ok(())
    }

    fn process_attribute(
        &mut self,
        ctx: &BuildContext,
        attr: &ParsedAttribute,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        let databinding = DATABIND_VALUE.captures(&attr.value);
        let expression = EXPRESSION_BUILDER_VALUE.captures(&attr.value);

        if attr.name.eq_ignore_ascii_case("id") {
            if !attr.filter.is_empty() || databinding.is_some() || expression.is_some() {
                return Err(ParseError::new(
                    ErrorCode::IdMustUseAttribute,
                    "The 'ID' property can only be set through a plain, unfiltered attribute.",
                ));
            }
            if ctx.in_theme() {
                return Err(ParseError::new(
                    ErrorCode::IdNotAllowedInTheme,
                    format!("The control '{}' cannot have an ID inside a theme.", self.tag_name),
                ));
            }
            self.id = Some(attr.value.trim().to_string());
            return Ok(());
        }
        if attr.name.eq_ignore_ascii_case("skinid") && attr.filter.is_empty() {
            self.skin_id = Some(attr.value.trim().to_string());
        }

        if let Some(caps) = databinding {
            let code = caps.name("code").map_or("", |m| m.as_str());
            let encode = caps.name("encode").is_some();
            return self.add_bound_property(ctx, &attr.filter, &attr.name, code, encode, location);
        }
        if let Some(caps) = expression {
            let code = caps.name("code").map_or("", |m| m.as_str());
            return self.add_expression_property(ctx, &attr.filter, &attr.name, code, location);
        }
        self.add_property(ctx, &attr.filter, &attr.name, &attr.value, location)
    }

    /// Resolve an attribute name; `Ok(None)` means the value goes through `SetAttribute`
    fn resolve_member(&self, ctx: &BuildContext, name: &str) -> Result<Option<MemberInfo>> {
        let Some(control_type) = self.control_type else {
            return Ok(None);
        };
        match get_member_info(ctx.registry, control_type, name)? {
            Some(info) => Ok(Some(info)),
            None if self.flags.contains(BuilderFlags::ATTRIBUTE_ACCESSOR) => Ok(None),
            None => Err(ParseError::new(
                ErrorCode::TypeDoesntHaveProperty,
                format!(
                    "Type '{}' does not have a public property named '{}'.",
                    self.type_display(),
                    name
                ),
            )),
        }
    }

    /// Bind a plain attribute value: an event hookup, a property or a raw attribute
    pub(crate) fn add_property(
        &mut self,
        ctx: &BuildContext,
        filter: &str,
        name: &str,
        value: &str,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        if let Some(event) = self.event_for_attribute(ctx, name) {
            return self.add_event(ctx, filter, &event, value, location);
        }

        let info = self.resolve_member(ctx, name)?;
        let use_set_attribute = match &info {
            None => true,
            Some(info) if !info.member.writable => {
                if self.flags.contains(BuilderFlags::ATTRIBUTE_ACCESSOR) {
                    true
                } else {
                    return Err(ParseError::new(
                        ErrorCode::PropertyReadOnly,
                        format!(
                            "The '{}' property of '{}' is read-only and cannot be set.",
                            info.canonical_name,
                            self.type_display()
                        ),
                    ));
                }
            }
            Some(_) => false,
        };

        let (header, converted) = if use_set_attribute {
            let header = self.header_for(ctx, filter, name, None, location);
            (header, PropertyValue::String(value.to_string()))
        } else {
            let info = info.as_ref().ok_or_else(|| {
                ParseError::new(ErrorCode::TypeDoesntHaveProperty, format!("Unknown property '{}'.", name))
            })?;
            let converted = convert_value(ctx.registry, info.member_type(), name, value)?;
            (self.header_for(ctx, filter, name, Some(info), location), converted)
        };
        let entry = SimplePropertyEntry {
            header,
            persisted_value: value.to_string(),
            value: converted,
            use_set_attribute,
        };
        collapse_into(&mut self.simple_properties, entry, |e| &e.header);
        Ok(())
    }

    /// Bind an unrecognised main directive attribute to a property of the root type
    pub(crate) fn add_directive_property(
        &mut self,
        ctx: &BuildContext,
        directive: &str,
        filter: &str,
        name: &str,
        value: &str,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        let not_supported = || {
            ParseError::new(
                ErrorCode::AttributeNotSupportedInDirective,
                format!("The '{}' attribute is not supported by the '{}' directive.", name, directive),
            )
        };
        if DATABIND_VALUE.is_match(value) {
            return Err(not_supported());
        }
        let result = match EXPRESSION_BUILDER_VALUE.captures(value) {
            Some(caps) => {
                let code = caps.name("code").map_or("", |m| m.as_str()).to_string();
                self.add_expression_property(ctx, filter, name, &code, location)
            }
            None => self.add_property(ctx, filter, name, value, location),
        };
        result.map_err(|e| match e.code {
            ErrorCode::TypeDoesntHaveProperty => not_supported(),
            _ => e,
        })
    }

    fn event_for_attribute(&self, ctx: &BuildContext, name: &str) -> Option<String> {
        let control_type = self.control_type?;
        let event = match name.get(..2) {
            Some(on) if on.eq_ignore_ascii_case("on") && name.len() > 2 => &name[2..],
            _ => return None,
        };
        ctx.registry.find_event(control_type, event).map(str::to_string)
    }

    fn add_event(
        &mut self,
        ctx: &BuildContext,
        filter: &str,
        event: &str,
        handler: &str,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        if ctx.in_theme() {
            return Err(ParseError::new(
                ErrorCode::EventNotAllowedInTheme,
                format!("The event '{}' cannot be hooked up inside a theme.", event),
            ));
        }
        if !filter.is_empty() {
            return Err(ParseError::new(
                ErrorCode::EventsCantBeFiltered,
                format!("The event '{}' cannot be device filtered.", event),
            ));
        }
        let handler = handler.trim();
        if handler.is_empty() {
            return Err(ParseError::new(
                ErrorCode::EventHandlerCantBeEmpty,
                format!("The handler for the event '{}' cannot be empty.", event),
            ));
        }
        if ctx.no_compile() {
            return Err(ParseError::new(
                ErrorCode::CompilationModeNever,
                format!(
                    "The event handler '{}' requires compilation, but the compilation mode is Never.",
                    handler
                ),
            ));
        }
        if let Some(filter) = ctx.preprocessing_filter() {
            if filter.process_event_hookup(self.id.as_deref(), event, handler) {
                return Ok(());
            }
        }
        let index = self.next_index();
        self.events.push(EventEntry {
            name: event.to_string(),
            handler_method_name: handler.to_string(),
            index,
            location,
        });
        Ok(())
    }

    /// Bind a `<%# ... %>` attribute value
    fn add_bound_property(
        &mut self,
        ctx: &BuildContext,
        filter: &str,
        name: &str,
        code: &str,
        encode: bool,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        if code.trim().is_empty() {
            return Err(ParseError::new(
                ErrorCode::EmptyExpression,
                format!("The databinding expression for '{}' is empty.", name),
            ));
        }
        let control_type = self.control_type;
        if let Some(t) = control_type {
            if ctx.registry.find_event(t, "DataBinding").is_none() {
                return Err(ParseError::new(
                    ErrorCode::DatabindingRequiresEvent,
                    format!(
                        "Databinding expressions are only supported on objects that have a DataBinding event. {} does not have a DataBinding event.",
                        self.type_display()
                    ),
                ));
            }
        }

        let mut field_name = None;
        let mut format_string = None;
        let mut two_way = false;
        if let Some(caps) = BIND_EXPRESSION.captures(code) {
            let params = BIND_PARAMETERS.captures(&caps["params"]).ok_or_else(badly_formatted_bind)?;
            field_name = params.name("dfield").or_else(|| params.name("sfield")).map(|m| m.as_str().to_string());
            format_string = params.name("dformat").or_else(|| params.name("sformat")).map(|m| m.as_str().to_string());
            if let Some(format) = &format_string {
                if !FORMAT_STRING.is_match(format) {
                    return Err(badly_formatted_bind());
                }
            }
            two_way = true;
        } else if let Some(caps) = BIND_ITEM_EXPRESSION.captures(code) {
            let params = BIND_ITEM_PARAMETERS.captures(&caps["params"]).ok_or_else(badly_formatted_bind)?;
            field_name = Some(params["field"].to_string());
            two_way = true;
        } else if ctx.no_compile() || ctx.in_theme() {
            if !crate::markup::patterns::EVAL_EXPRESSION.is_match(code) {
                ctx.ensure_code_allowed()?;
            }
        } else {
            if let Some(filter) = ctx.preprocessing_filter() {
                if filter.process_data_binding_attribute(self.id.as_deref(), name, code) {
                    return Ok(());
                }
            }
            ctx.ensure_code_allowed()?;
        }

        let info = self.resolve_member(ctx, name)?;
        if two_way && info.is_none() {
            return Err(ParseError::new(
                ErrorCode::TwoWayBindingNonProperty,
                format!(
                    "Two-way databinding to '{}' is not supported; Bind() requires a public property of '{}'.",
                    name,
                    self.type_display()
                ),
            ));
        }
        let header = self.header_for(ctx, filter, name, info.as_ref(), location);
        let mut entry = BoundPropertyEntry::new(header, "", code);
        entry.read_only_property = info.as_ref().map_or(false, |i| !i.member.writable);
        entry.use_set_attribute = info.is_none();
        entry.two_way_bound = two_way;
        entry.field_name = field_name;
        entry.format_string = format_string;
        entry.encoded = encode;
        self.push_bound(entry)
    }

    /// Bind a `<%$ prefix: value %>` attribute value
    fn add_expression_property(
        &mut self,
        ctx: &BuildContext,
        filter: &str,
        name: &str,
        code: &str,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        if ctx.in_theme() {
            return Err(ParseError::new(
                ErrorCode::ExpressionsNotAllowedInThemes,
                "Expressions of the form <%$ ... %> are not allowed in themes.",
            ));
        }
        let (prefix, value) = match code.split_once(':') {
            Some((prefix, value)) if !prefix.trim().is_empty() => (prefix.trim(), value.trim()),
            _ => {
                return Err(ParseError::new(
                    ErrorCode::MissingExpressionPrefix,
                    format!("The expression prefix is missing in '<%$ {} %>'.", code.trim()),
                ))
            }
        };
        if value.is_empty() {
            return Err(ParseError::new(
                ErrorCode::MissingExpressionValue,
                format!("The expression '<%$ {} %>' has no value after its prefix.", code.trim()),
            ));
        }
        let builder = ctx.expressions.get(prefix).ok_or_else(|| {
            ParseError::new(
                ErrorCode::UnknownExpressionPrefix,
                format!(
                    "The expression prefix '{}' was not recognized. Please correct the prefix or register the prefix in the configuration.",
                    prefix
                ),
            )
        })?;
        if ctx.no_compile() && !builder.supports_evaluate() {
            return Err(ParseError::new(
                ErrorCode::CannotEvaluateExpression,
                format!(
                    "The expression prefix '{}' cannot be used when the compilation mode is Never.",
                    prefix
                ),
            ));
        }
        let expr_ctx = ExpressionContext::new(ctx.config, &ctx.template_control.virtual_path);
        let parsed = builder.parse_expression(value, &expr_ctx)?;

        let info = self.resolve_member(ctx, name)?;
        let header = self.header_for(ctx, filter, name, info.as_ref(), location);
        let mut entry = BoundPropertyEntry::new(header, builder.prefix(), value);
        entry.parsed_expression_data = Some(parsed);
        entry.read_only_property = info.as_ref().map_or(false, |i| !i.member.writable);
        entry.use_set_attribute = info.is_none();
        self.push_bound(entry)
    }

    fn push_bound(&mut self, entry: BoundPropertyEntry) -> Result<()> {
        if self.bound_properties.iter().any(|e| e.header.same_slot(&entry.header)) {
            return Err(ParseError::new(
                ErrorCode::MultipleBoundEntries,
                format!("The property '{}' cannot have more than one bound expression.", entry.header.name),
            ));
        }
        self.bound_properties.push(entry);
        Ok(())
    }

    /// `meta:resourcekey` pulls every `Key.Property` local resource in as a
    /// generated `Resources` expression, unless the property is set explicitly.
    fn add_implicit_resources(&mut self, ctx: &BuildContext) {
        let Some(key) = self.resource_key.clone() else {
            return;
        };
        let Some(resources) = local_resources_for(ctx.config, &ctx.template_control.virtual_path) else {
            return;
        };
        let prefix = format!("{}.", key);
        let mut implicit = Vec::new();
        for resource in resources.keys() {
            match resource.get(..prefix.len()) {
                Some(head) if head.eq_ignore_ascii_case(&prefix) && resource.len() > prefix.len() => {}
                _ => continue,
            }
            let property = resource[prefix.len()..].to_string();
            let explicit = self.bound_properties.iter().any(|e| e.header.name.eq_ignore_ascii_case(&property))
                || self.simple_properties.iter().any(|e| e.header.name.eq_ignore_ascii_case(&property));
            if !explicit {
                implicit.push((resource.clone(), property));
            }
        }
        for (resource, property) in implicit {
            let member_path = property.replace('.', "-");
            let info = match self.control_type {
                Some(t) => get_member_info(ctx.registry, t, &member_path).ok().flatten(),
                None => None,
            };
            if info.is_none() && !self.flags.contains(BuilderFlags::ATTRIBUTE_ACCESSOR) {
                log::debug!("implicit resource '{}' matches no property of '{}'", resource, self.type_display());
                continue;
            }
            let header = self.header_for(ctx, "", &property, info.as_ref(), self.location.clone());
            let mut entry = BoundPropertyEntry::new(header, "Resources", &resource);
            entry.parsed_expression_data = Some(serde_json::json!({ "classKey": null, "resourceKey": resource }));
            entry.use_set_attribute = info.is_none();
            entry.generated = true;
            self.bound_properties.push(entry);
        }
    }

    // Children

    /// Create the builder for a property element of this builder's type
    pub(crate) fn create_property_builder(
        &self,
        ctx: &BuildContext,
        info: &MemberInfo,
        filter: &str,
        tag_name: &str,
        attributes: &ParsedAttributeCollection,
        location: Option<SourceLocation>,
    ) -> Result<ControlBuilder> {
        let registry = ctx.registry;
        let member_type = info.member_type();
        let target = PropertyTarget {
            name: info.canonical_name.clone(),
            filter: filter.to_string(),
            declaring_type: Some(registry.full_name(info.member.declaring_type).to_string()),
            member_type: Some(registry.full_name(member_type).to_string()),
            read_only: !info.member.writable,
        };

        let mut builder = if registry.is_a(member_type, "System.Web.UI.ITemplate") {
            let data = TemplateData::new(ctx, &info.member);
            let mut builder = ControlBuilder::new(BuilderKind::Template(data), tag_name);
            builder.control_type = Some(member_type);
            builder.type_name = Some(registry.full_name(member_type).to_string());
            builder.flags = BuilderFlags::IS_CONTROL;
            builder.location = location;
            builder
        } else if registry.get(member_type).value_kind == ValueKind::String {
            let mut builder = ControlBuilder::new(BuilderKind::StringProperty, tag_name);
            builder.control_type = Some(member_type);
            builder.type_name = Some(registry.full_name(member_type).to_string());
            builder.location = location;
            builder
        } else if super::collection::infer_item_type(registry, member_type).is_some()
            || registry.is_a(member_type, "System.Collections.IList")
        {
            let data = CollectionData::new(registry, member_type, self.control_type);
            let mut builder = ControlBuilder::new(BuilderKind::Collection(data), tag_name);
            builder.control_type = Some(member_type);
            builder.type_name = Some(registry.full_name(member_type).to_string());
            builder.flags = BuilderFlags::CHILDREN_AS_PROPERTIES;
            builder.location = location;
            builder
        } else {
            let mut builder = ControlBuilder::new(BuilderKind::Control, tag_name);
            builder.init(ctx, member_type, attributes, location)?;
            builder
        };
        builder.in_designer = ctx.in_designer;
        builder.filter = filter.to_string();
        builder.property = Some(target);
        Ok(builder)
    }

    /// Resolve a child element when this builder handles its child tags
    pub fn create_child_builder(
        &self,
        ctx: &BuildContext,
        tag_name: &str,
        attributes: &ParsedAttributeCollection,
        location: Option<SourceLocation>,
    ) -> Result<ChildBuilder> {
        match &self.kind {
            BuilderKind::Ignored => return Ok(ChildBuilder::Dropped),
            BuilderKind::Collection(data) => {
                let input_type = attributes.get("type");
                return match data.child_type(ctx, self.control_type, tag_name, input_type)? {
                    Some(child_type) => Ok(ChildBuilder::Created(ControlBuilder::for_control(
                        ctx, child_type, tag_name, attributes, location,
                    )?)),
                    None => Ok(ChildBuilder::Dropped),
                };
            }
            _ => {}
        }
        if !self.children_as_properties() {
            return Ok(ChildBuilder::Default);
        }
        let Some(control_type) = self.control_type else {
            return Ok(ChildBuilder::Default);
        };

        let (filter, property) = parse_property_device_filter(tag_name);
        let filter_known = filter.is_empty() || ctx.filter_resolution.is_known_filter(&filter);
        if filter_known && !property.contains(':') {
            if let Some(info) = get_member_info(ctx.registry, control_type, &property)? {
                let builder = self.create_property_builder(ctx, &info, &filter, tag_name, attributes, location)?;
                return Ok(ChildBuilder::Created(builder));
            }
        }
        if let Some(default) = &self.default_property_builder {
            return default.create_child_builder(ctx, tag_name, attributes, location);
        }
        if self.flags.contains(BuilderFlags::IGNORE_UNKNOWN_CONTENT) {
            return Ok(ChildBuilder::Dropped);
        }
        Err(ParseError::new(
            ErrorCode::TypeDoesntHaveProperty,
            format!(
                "Type '{}' does not have a public property named '{}'.",
                self.type_display(),
                tag_name
            ),
        ))
    }

    /// Append literal text between child elements
    pub fn append_literal_string(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        match self.kind {
            BuilderKind::Ignored | BuilderKind::ObjectTag(_) => return Ok(()),
            BuilderKind::StringProperty => {
                self.push_literal(text);
                return Ok(());
            }
            BuilderKind::Collection(ref data) => {
                if is_whitespace_string(text) || data.ignore_unknown_content {
                    return Ok(());
                }
                return Err(self.literal_not_allowed(text));
            }
            _ => {}
        }
        if self.needs_tag_inner_text() {
            return Ok(());
        }
        if self.children_as_properties() {
            if is_whitespace_string(text) || self.flags.contains(BuilderFlags::IGNORE_UNKNOWN_CONTENT) {
                return Ok(());
            }
            if let Some(default) = self.default_property_builder.as_mut() {
                return default.append_literal_string(text);
            }
            return Err(self.literal_not_allowed(text));
        }
        if self.flags.contains(BuilderFlags::NO_WHITESPACE_LITERALS) && is_whitespace_string(text) {
            return Ok(());
        }
        let text = if self.flags.contains(BuilderFlags::HTML_DECODE_LITERALS) {
            html_decode(text)
        } else {
            text.to_string()
        };
        if let Some(SubBuilder::Builder(last)) = self.sub_builders.last_mut() {
            if matches!(last.kind, BuilderKind::DataBoundLiteral) {
                last.add_bound_literal_string(&text);
                return Ok(());
            }
        }
        self.push_literal(&text);
        Ok(())
    }

    fn push_literal(&mut self, text: &str) {
        match self.sub_builders.last_mut() {
            Some(SubBuilder::Literal(last)) => last.push_str(text),
            _ => self.sub_builders.push(SubBuilder::Literal(text.to_string())),
        }
    }

    fn literal_not_allowed(&self, text: &str) -> ParseError {
        ParseError::new(
            ErrorCode::LiteralContentNotAllowed,
            format!(
                "Literal content ('{}') is not allowed within a '{}'.",
                text.trim(),
                self.type_display()
            ),
        )
    }

    fn children_not_supported(&self, child: &ControlBuilder) -> ParseError {
        ParseError::new(
            ErrorCode::ChildrenNotSupported,
            format!(
                "'{}' cannot have children of type '{}'.",
                self.type_display(),
                child.type_display()
            ),
        )
    }

    fn code_not_supported() -> ParseError {
        ParseError::new(ErrorCode::CodeNotSupportedOnNotControls, "Code blocks are not supported in this context.")
    }

    /// Append a child builder: a property element, a code block or a control
    pub fn append_sub_builder(&mut self, child: ControlBuilder) -> Result<()> {
        if matches!(self.kind, BuilderKind::Ignored) || matches!(child.kind, BuilderKind::Ignored) {
            return Ok(());
        }
        match self.kind {
            BuilderKind::ObjectTag(_) => return Err(self.children_not_supported(&child)),
            BuilderKind::StringProperty => {
                if matches!(child.kind, BuilderKind::CodeBlock(_)) {
                    return Err(Self::code_not_supported());
                }
                return Err(self.children_not_supported(&child));
            }
            _ => {}
        }

        if child.property.is_some() {
            self.add_property_builder_entry(child);
            return Ok(());
        }

        if let BuilderKind::Collection(_) = self.kind {
            if matches!(child.kind, BuilderKind::CodeBlock(_)) {
                return Err(Self::code_not_supported());
            }
            let mut header = EntryHeader::new("", child.type_display());
            header.member_type = child.type_name.clone();
            header.location = child.location.clone();
            header.index = self.next_index();
            self.complex_properties.push(ComplexPropertyEntry {
                header,
                builder: child,
                is_collection_item: true,
            });
            return Ok(());
        }

        if let Some(default) = self.default_property_builder.as_mut() {
            return default.append_sub_builder(child);
        }

        if let BuilderKind::CodeBlock(data) = &child.kind {
            if self.children_as_properties() || !self.is_control() {
                return Err(Self::code_not_supported());
            }
            if data.block_type == CodeBlockType::DataBinding {
                if data.is_bind() {
                    return Err(ParseError::new(
                        ErrorCode::DataBoundLiteralsCantBind,
                        "Bind() can only be used as the value of a control property, not in literal content.",
                    ));
                }
                self.append_data_binding(child);
                return Ok(());
            }
            self.sub_builders.push(SubBuilder::Builder(Box::new(child)));
            return Ok(());
        }

        if self.children_as_properties() || !self.is_control() || self.needs_tag_inner_text() {
            return Err(self.children_not_supported(&child));
        }
        self.sub_builders.push(SubBuilder::Builder(Box::new(child)));
        Ok(())
    }

    fn append_data_binding(&mut self, code_block: ControlBuilder) {
        if let Some(SubBuilder::Builder(last)) = self.sub_builders.last_mut() {
            if matches!(last.kind, BuilderKind::DataBoundLiteral) {
                last.add_data_binding(code_block);
                return;
            }
        }
        let mut dbl = ControlBuilder::data_bound_literal(code_block.location.clone());
        if let Some(SubBuilder::Literal(_)) = self.sub_builders.last() {
            if let Some(SubBuilder::Literal(text)) = self.sub_builders.pop() {
                dbl.add_bound_literal_string(&text);
            }
        }
        dbl.add_data_binding(code_block);
        self.sub_builders.push(SubBuilder::Builder(Box::new(dbl)));
    }

    fn add_property_builder_entry(&mut self, child: ControlBuilder) {
        let Some(target) = child.property.clone() else {
            return;
        };
        let mut header = EntryHeader::new(&target.filter, &target.name).with_location(child.location.clone());
        header.declaring_type = target.declaring_type.clone();
        header.member_type = target.member_type.clone();
        header.read_only = target.read_only;
        header.index = self.next_index();
        match &child.kind {
            BuilderKind::Template(data) => {
                let bindable = data.bindable;
                let entry = TemplatePropertyEntry { header, builder: child, bindable };
                collapse_into(&mut self.template_properties, entry, |e| &e.header);
            }
            BuilderKind::StringProperty => {
                let text = child.string_property_text();
                let entry = SimplePropertyEntry {
                    header,
                    persisted_value: text.clone(),
                    value: PropertyValue::String(text),
                    use_set_attribute: false,
                };
                collapse_into(&mut self.simple_properties, entry, |e| &e.header);
            }
            _ => {
                let entry = ComplexPropertyEntry { header, builder: child, is_collection_item: false };
                collapse_into(&mut self.complex_properties, entry, |e| &e.header);
            }
        }
    }

    /// Concatenated text of a string property element
    pub fn string_property_text(&self) -> String {
        self.sub_builders
            .iter()
            .filter_map(|s| match s {
                SubBuilder::Literal(text) => Some(text.as_str()),
                SubBuilder::Builder(_) => None,
            })
            .collect()
    }

    /// Raw text between the begin and end tag of an inner-text control
    pub fn set_tag_inner_text(&mut self, text: &str) {
        self.inner_text = Some(text.to_string());
    }

    /// Finish the builder when its end tag (or the end of a self-closed tag) is seen
    pub fn close_control(&mut self, ctx: &BuildContext) -> Result<()> {
        if let Some(mut default) = self.default_property_builder.take() {
            if !default.sub_builders.is_empty() || !default.complex_properties.is_empty() {
                default.close_control(ctx)?;
                self.add_property_builder_entry(*default);
            }
        }

        if let BuilderKind::Collection(data) = &self.kind {
            for item in self.complex_properties.iter().filter(|e| e.is_collection_item) {
                if let Some(item_type) = item.builder.control_type {
                    data.check_item(ctx.registry, self.control_type, &item.builder.tag_name, item_type)?;
                }
            }
        }

        if let BuilderKind::Template(data) = &self.kind {
            if data.bindable {
                let mut bindings = Vec::new();
                collect_two_way_bindings(&self.sub_builders, &mut bindings);
                if let BuilderKind::Template(data) = &mut self.kind {
                    data.two_way_bindings = bindings;
                }
            }
        }

        if self.needs_tag_inner_text() {
            self.apply_inner_text(ctx)?;
        }

        self.closed = true;
        Ok(())
    }

    fn apply_inner_text(&mut self, ctx: &BuildContext) -> Result<()> {
        let (Some(text), Some(control_type)) = (self.inner_text.clone(), self.control_type) else {
            return Ok(());
        };
        if is_whitespace_string(&text) {
            return Ok(());
        }
        let Some(property) = ctx.registry.inner_text_property(control_type).map(str::to_string) else {
            return Ok(());
        };
        let explicit = self.simple_properties.iter().any(|e| e.header.name.eq_ignore_ascii_case(&property))
            || self.bound_properties.iter().any(|e| e.header.name.eq_ignore_ascii_case(&property));
        if explicit {
            return Ok(());
        }
        let text = if self.flags.contains(BuilderFlags::HTML_DECODE_LITERALS) {
            html_decode(&text)
        } else {
            text
        };
        let location = self.location.clone();
        self.add_property(ctx, "", &property, &text, location)
    }

    /// Child control builders in document order (code blocks and literals excluded)
    pub fn child_controls(&self) -> impl Iterator<Item = &ControlBuilder> {
        self.sub_builders.iter().filter_map(|s| match s {
            SubBuilder::Builder(b) if matches!(b.kind, BuilderKind::Control) => Some(b.as_ref()),
            _ => None,
        })
    }

    pub fn simple_property(&self, name: &str) -> Option<&SimplePropertyEntry> {
        self.simple_properties
            .iter()
            .find(|e| e.header.filter.is_empty() && e.header.name.eq_ignore_ascii_case(name))
    }

    pub fn bound_property(&self, name: &str) -> Option<&BoundPropertyEntry> {
        self.bound_properties.iter().find(|e| e.header.name.eq_ignore_ascii_case(name))
    }

    pub fn complex_property(&self, name: &str) -> Option<&ComplexPropertyEntry> {
        self.complex_properties
            .iter()
            .find(|e| !e.is_collection_item && e.header.name.eq_ignore_ascii_case(name))
    }

    pub fn template_property(&self, name: &str) -> Option<&TemplatePropertyEntry> {
        self.template_properties.iter().find(|e| e.header.name.eq_ignore_ascii_case(name))
    }

    /// Items of a collection builder
    pub fn collection_items(&self) -> impl Iterator<Item = &ControlBuilder> {
        self.complex_properties.iter().filter(|e| e.is_collection_item).map(|e| &e.builder)
    }
}

fn badly_formatted_bind() -> ParseError {
    ParseError::new(
        ErrorCode::BadlyFormattedBind,
        "A call to Bind was not well formatted. Bind takes a field name in quotes and an optional format string.",
    )
}

/// Two-way bindings of the controls under a bindable template, not crossing nested templates
fn collect_two_way_bindings(sub_builders: &[SubBuilder], out: &mut Vec<BoundPropertyEntry>) {
    for sub in sub_builders {
        let SubBuilder::Builder(builder) = sub else {
            continue;
        };
        out.extend(builder.bound_properties.iter().filter(|e| e.two_way_bound).cloned());
        for complex in &builder.complex_properties {
            out.extend(complex.builder.bound_properties.iter().filter(|e| e.two_way_bound).cloned());
        }
        collect_two_way_bindings(&builder.sub_builders, out);
    }
}
