//! No-Compile Materialisation
//!
//! Pages in compilation mode `Never` (and designer previews) are not turned
//! into code: the build tree is walked and every builder produces a
//! [`LiveObject`] with its properties applied, its children built and its
//! templates kept as instantiable [`TemplateNode`]s.

use super::control_builder::{BuilderKind, ControlBuilder, SubBuilder};
use super::persist_data::PropertyEntryRef;
use super::template::{TemplateControlInfo, TemplateNode};
use crate::config::ParserConfig;
use crate::error::{ErrorCode, ParseError, Result};
use crate::expressions::{ExpressionBuilderRegistry, ExpressionContext};
use crate::schema::{convert_value, find_member, PropertyValue, TypeRegistry};
use crate::virtual_path::VirtualPath;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

const LITERAL_CONTROL: &str = "System.Web.UI.LiteralControl";
const DATA_BOUND_LITERAL_CONTROL: &str = "System.Web.UI.DataBoundLiteralControl";

/// A `<%# %>` binding recorded on a live object, evaluated at databinding time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveDataBinding {
    pub property: String,
    pub expression: String,
    pub two_way: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub enum LiveValue {
    Value(PropertyValue),
    Object(LiveObject),
    Collection(Vec<LiveObject>),
    Template(TemplateNode),
    Strings(Vec<String>),
}

/// An object created from a builder
#[derive(Debug, Clone, Default, Serialize)]
pub struct LiveObject {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, LiveValue>,
    /// Values set through the attribute accessor
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LiveObject>,
    /// Event name to handler method
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub events: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_bindings: Vec<LiveDataBinding>,
    /// Items of a collection object
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LiveObject>,
}

impl LiveObject {
    pub fn new(type_name: &str) -> Self {
        LiveObject {
            type_name: type_name.to_string(),
            ..LiveObject::default()
        }
    }

    /// Value at a dotted path (`Font.Bold`)
    pub fn get(&self, path: &str) -> Option<&LiveValue> {
        match path.split_once('.') {
            None => self.properties.get(path),
            Some((head, rest)) => match self.properties.get(head)? {
                LiveValue::Object(inner) => inner.get(rest),
                _ => None,
            },
        }
    }

    /// Simple value at a dotted path
    pub fn value(&self, path: &str) -> Option<&PropertyValue> {
        match self.get(path)? {
            LiveValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Set a value at a dotted path, creating intermediate sub-objects typed from the registry
    pub fn set_path(&mut self, registry: &TypeRegistry, path: &str, value: LiveValue) {
        let Some((head, rest)) = path.split_once('.') else {
            self.properties.insert(path.to_string(), value);
            return;
        };
        let member_type = registry
            .find(&self.type_name)
            .and_then(|t| find_member(registry, t, head).ok().flatten())
            .map(|m| registry.full_name(m.member_type).to_string())
            .unwrap_or_default();
        let slot = self
            .properties
            .entry(head.to_string())
            .or_insert_with(|| LiveValue::Object(LiveObject::new(&member_type)));
        if !matches!(slot, LiveValue::Object(_)) {
            *slot = LiveValue::Object(LiveObject::new(&member_type));
        }
        if let LiveValue::Object(inner) = slot {
            inner.set_path(registry, rest, value);
        }
    }

    /// Depth-first search by ID, not crossing into templates
    pub fn find_control(&self, id: &str) -> Option<&LiveObject> {
        self.children.iter().find_map(|child| {
            if child.id.as_deref().map_or(false, |i| i.eq_ignore_ascii_case(id)) {
                Some(child)
            } else {
                child.find_control(id)
            }
        })
    }
}

/// Services a build needs
pub struct ObjectBuildContext<'a> {
    pub registry: &'a TypeRegistry,
    pub config: &'a ParserConfig,
    pub expressions: &'a ExpressionBuilderRegistry,
    pub virtual_path: &'a VirtualPath,
    pub template_control: TemplateControlInfo,
    /// Keep templates as compiled references instead of live builders
    pub compiled_templates: bool,
}

impl<'a> ObjectBuildContext<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        config: &'a ParserConfig,
        expressions: &'a ExpressionBuilderRegistry,
        virtual_path: &'a VirtualPath,
    ) -> Self {
        ObjectBuildContext {
            registry,
            config,
            expressions,
            virtual_path,
            template_control: TemplateControlInfo {
                virtual_path: virtual_path.clone(),
                type_name: None,
            },
            compiled_templates: false,
        }
    }

    pub fn build(&self, builder: &ControlBuilder) -> Result<LiveObject> {
        match &builder.kind {
            BuilderKind::DataBoundLiteral => return Ok(self.build_data_bound_literal(builder)),
            BuilderKind::Collection(_) => {
                let mut object = LiveObject::new(builder.type_name.as_deref().unwrap_or_default());
                object.items = self.build_items(builder)?;
                return Ok(object);
            }
            _ => {}
        }

        let mut object = LiveObject::new(builder.type_name.as_deref().unwrap_or_default());
        if let Some(id) = &builder.id {
            object.id = Some(id.clone());
            object.properties.insert("ID".to_string(), LiveValue::Value(PropertyValue::String(id.clone())));
        }
        if let Some(t) = builder.control_type {
            if self.registry.is_a(t, "System.Web.UI.HtmlControls.HtmlGenericControl") {
                object.properties.insert(
                    "TagName".to_string(),
                    LiveValue::Value(PropertyValue::String(builder.tag_name.clone())),
                );
            }
        }
        self.apply_properties(builder, &mut object)?;
        object.items = self.build_items(builder)?;
        object.children = self.build_children(builder)?;
        Ok(object)
    }

    fn apply_properties(&self, builder: &ControlBuilder, object: &mut LiveObject) -> Result<()> {
        let persist = builder.persist_data();
        for entry in persist.all_property_entries() {
            match entry {
                PropertyEntryRef::Simple(simple) => {
                    if simple.use_set_attribute {
                        object
                            .attributes
                            .insert(simple.header.name.clone(), simple.persisted_value.clone());
                    } else {
                        object.set_path(self.registry, &simple.header.name, LiveValue::Value(simple.value.clone()));
                    }
                }
                PropertyEntryRef::Complex(complex) => {
                    let value = match complex.builder.kind {
                        BuilderKind::Collection(_) => LiveValue::Collection(self.build_items(&complex.builder)?),
                        _ => LiveValue::Object(self.build(&complex.builder)?),
                    };
                    object.set_path(self.registry, &complex.header.name, value);
                }
                PropertyEntryRef::Template(template) => {
                    let node = if self.compiled_templates {
                        TemplateNode::Compiled {
                            template_id: format!(
                                "{}#{}.{}",
                                self.virtual_path,
                                builder.id.as_deref().unwrap_or(&builder.tag_name),
                                template.header.name
                            ),
                        }
                    } else {
                        TemplateNode::Live(Arc::new(template.builder.clone()))
                    };
                    object.set_path(self.registry, &template.header.name, LiveValue::Template(node));
                }
                PropertyEntryRef::Bound(bound) if bound.is_databinding() => {
                    object.data_bindings.push(LiveDataBinding {
                        property: bound.header.name.clone(),
                        expression: bound.expression.trim().to_string(),
                        two_way: bound.two_way_bound,
                        field_name: bound.field_name.clone(),
                        format_string: bound.format_string.clone(),
                    });
                }
                PropertyEntryRef::Bound(bound) => {
                    let expression_builder = self.expressions.get(&bound.expression_prefix).ok_or_else(|| {
                        ParseError::new(
                            ErrorCode::UnknownExpressionPrefix,
                            format!("The expression prefix '{}' was not recognized.", bound.expression_prefix),
                        )
                    })?;
                    if !expression_builder.supports_evaluate() {
                        return Err(ParseError::new(
                            ErrorCode::CannotEvaluateExpression,
                            format!(
                                "The expression '<%$ {}: {} %>' cannot be evaluated without compilation.",
                                bound.expression_prefix, bound.expression
                            ),
                        ));
                    }
                    let ctx = ExpressionContext::new(self.config, self.virtual_path);
                    let parsed = bound.parsed_expression_data.clone().unwrap_or_default();
                    let text = expression_builder.evaluate(&parsed, &ctx)?;
                    if bound.use_set_attribute {
                        object.attributes.insert(bound.header.name.clone(), text);
                        continue;
                    }
                    let value = match bound.header.member_type.as_deref().and_then(|t| self.registry.find(t)) {
                        Some(member_type) => convert_value(self.registry, member_type, &bound.header.name, &text)?,
                        None => PropertyValue::String(text),
                    };
                    object.set_path(self.registry, &bound.header.name, LiveValue::Value(value));
                }
            }
        }
        for event in &builder.events {
            object.events.insert(event.name.clone(), event.handler_method_name.clone());
        }
        Ok(())
    }

    fn build_items(&self, builder: &ControlBuilder) -> Result<Vec<LiveObject>> {
        builder.collection_items().map(|item| self.build(item)).collect()
    }

    /// Objects for the literal text and child builders of `builder`
    pub fn build_children(&self, builder: &ControlBuilder) -> Result<Vec<LiveObject>> {
        let mut children = Vec::new();
        for sub in &builder.sub_builders {
            match sub {
                SubBuilder::Literal(text) => {
                    let mut literal = LiveObject::new(LITERAL_CONTROL);
                    literal
                        .properties
                        .insert("Text".to_string(), LiveValue::Value(PropertyValue::String(text.clone())));
                    children.push(literal);
                }
                SubBuilder::Builder(child) => match child.kind {
                    BuilderKind::CodeBlock(_) => {
                        log::debug!("skipping code block at {:?}: it needs compilation", child.location);
                    }
                    BuilderKind::Ignored => {}
                    _ => children.push(self.build(child)?),
                },
            }
        }
        Ok(children)
    }

    fn build_data_bound_literal(&self, builder: &ControlBuilder) -> LiveObject {
        let mut object = LiveObject::new(DATA_BOUND_LITERAL_CONTROL);
        object.properties.insert(
            "StaticLiterals".to_string(),
            LiveValue::Strings(builder.static_literals().into_iter().map(str::to_string).collect()),
        );
        object.data_bindings = builder
            .data_bound_expressions()
            .into_iter()
            .map(|expression| LiveDataBinding {
                property: "Text".to_string(),
                expression: expression.trim().to_string(),
                two_way: false,
                field_name: None,
                format_string: None,
            })
            .collect();
        object
    }
}

impl ControlBuilder {
    /// Materialise this builder and its subtree
    pub fn build_object(&self, ctx: &ObjectBuildContext) -> Result<LiveObject> {
        ctx.build(self)
    }
}
