//! Object Tag Builder
//!
//! `<object runat="server">` declares an object created per page, session or
//! application. The type comes from exactly one of `class`, `classid` or
//! `progid`; COM types are late-bound and register no type dependency.

use super::control_builder::{BuilderKind, ControlBuilder};
use super::BuildContext;
use crate::error::{ErrorCode, ParseError, Result};
use crate::markup::ParsedAttributeCollection;
use crate::parse_util::{is_valid_identifier, SourceLocation};
use crate::schema::TypeFlags;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static GUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{?[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\}?$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectTagScope {
    Default,
    Page,
    Session,
    Application,
    AppInstance,
}

impl ObjectTagScope {
    pub fn parse(value: &str) -> Option<ObjectTagScope> {
        match value.trim().to_ascii_lowercase().as_str() {
            "page" => Some(ObjectTagScope::Page),
            "session" => Some(ObjectTagScope::Session),
            "application" => Some(ObjectTagScope::Application),
            "appinstance" => Some(ObjectTagScope::AppInstance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectTagData {
    pub scope: ObjectTagScope,
    pub type_name: Option<String>,
    pub class_id: Option<String>,
    pub prog_id: Option<String>,
    pub late_bound: bool,
}

impl ControlBuilder {
    /// Build an object tag from its attributes (`runat` already removed)
    pub fn object_tag(
        ctx: &BuildContext,
        tag_name: &str,
        attributes: &ParsedAttributeCollection,
        location: Option<SourceLocation>,
    ) -> Result<ControlBuilder> {
        let mut id = None;
        let mut scope = ObjectTagScope::Default;
        let mut class = None;
        let mut class_id = None;
        let mut prog_id = None;
        let mut late_bound = false;
        for attr in attributes.iter() {
            let value = attr.value.trim();
            match attr.name.to_ascii_lowercase().as_str() {
                "id" => id = Some(value.to_string()),
                "scope" => {
                    scope = ObjectTagScope::parse(value).ok_or_else(|| {
                        ParseError::new(
                            ErrorCode::InvalidAttributeValue,
                            format!("The value '{}' is not valid for the 'scope' attribute.", value),
                        )
                    })?
                }
                "class" => class = Some(value.to_string()),
                "classid" => class_id = Some(value.to_string()),
                "progid" => prog_id = Some(value.to_string()),
                "latebinding" => late_bound = value.eq_ignore_ascii_case("true"),
                other => {
                    return Err(ParseError::new(
                        ErrorCode::AttributeNotSupportedInDirective,
                        format!("The '{}' attribute is not supported on an object tag.", other),
                    ))
                }
            }
        }
        let id = id.filter(|i| !i.is_empty()).ok_or_else(|| {
            ParseError::new(ErrorCode::MissingAttribute, "The object tag must have an 'id' attribute.")
        })?;
        if !is_valid_identifier(&id) {
            return Err(ParseError::new(
                ErrorCode::InvalidIdentifier,
                format!("'{}' is not a valid identifier.", id),
            ));
        }
        let given = [&class, &class_id, &prog_id].iter().filter(|a| a.is_some()).count();
        if given == 0 {
            return Err(ParseError::new(
                ErrorCode::ObjectTagMustHaveClass,
                "The object tag must have a 'class', 'classid' or 'progid' attribute.",
            ));
        }
        if given > 1 {
            return Err(ParseError::new(
                ErrorCode::AttributesMutuallyExclusive,
                "The 'class', 'classid' and 'progid' attributes are mutually exclusive.",
            ));
        }

        let registry = ctx.registry;
        let mut type_name = None;
        if let Some(class) = &class {
            let ty = registry.find(class).ok_or_else(|| {
                ParseError::new(ErrorCode::TypeNotFound, format!("Could not load type '{}'.", class))
            })?;
            late_bound |= registry.has_flag(ty, TypeFlags::COM_CLASSIC);
            type_name = Some(registry.full_name(ty).to_string());
        }
        if let Some(raw) = &class_id {
            let guid = raw.strip_prefix("clsid:").or_else(|| raw.strip_prefix("CLSID:")).unwrap_or(raw);
            if !GUID.is_match(guid) {
                return Err(ParseError::new(
                    ErrorCode::InvalidClassId,
                    format!("'{}' is not a valid class id.", raw),
                ));
            }
            let guid = guid.trim_matches(|c| c == '{' || c == '}');
            type_name = (0..registry.len() as u32)
                .map(|i| registry.get(crate::schema::TypeId(i)))
                .find(|t| t.guid.as_deref().map_or(false, |g| g.eq_ignore_ascii_case(guid)))
                .map(|t| t.full_name.clone());
            late_bound = true;
        }
        if let Some(prog) = &prog_id {
            type_name = (0..registry.len() as u32)
                .map(|i| registry.get(crate::schema::TypeId(i)))
                .find(|t| t.progid.as_deref().map_or(false, |p| p.eq_ignore_ascii_case(prog)))
                .map(|t| t.full_name.clone());
            late_bound = true;
        }

        let mut builder = ControlBuilder::new(
            BuilderKind::ObjectTag(ObjectTagData {
                scope,
                type_name: type_name.clone(),
                class_id,
                prog_id,
                late_bound,
            }),
            tag_name,
        );
        builder.id = Some(id);
        builder.type_name = type_name;
        builder.location = location;
        builder.attributes = attributes.clone();
        Ok(builder)
    }

    pub fn object_tag_data(&self) -> Option<&ObjectTagData> {
        match &self.kind {
            BuilderKind::ObjectTag(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn set_object_tag_scope(&mut self, scope: ObjectTagScope) {
        if let BuilderKind::ObjectTag(data) = &mut self.kind {
            data.scope = scope;
        }
    }
}
