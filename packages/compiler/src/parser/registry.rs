//! Tag Prefix Registry
//!
//! `<%@ Register %>` directives (and application-level registrations) map tag
//! prefixes to namespaces, or a prefix and tag name to a user control. The
//! registry resolves server tags against them; unprefixed tags resolve
//! through the HTML control table.

use super::services::TypeResolutionService;
use crate::config::ParserConfig;
use crate::error::{ErrorCode, ParseError, Result};
use crate::markup::html_tags::html_control_type;
use crate::schema::{TypeId, TypeRegistry};
use crate::virtual_path::VirtualPath;
use serde::Serialize;

const USER_CONTROL_TYPE: &str = "System.Web.UI.UserControl";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagNamespaceRegisterEntry {
    pub tag_prefix: String,
    pub namespace: String,
    pub assembly: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserControlRegisterEntry {
    pub tag_prefix: String,
    pub tag_name: String,
    pub virtual_path: VirtualPath,
}

/// A resolved server tag
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTag {
    pub type_id: TypeId,
    /// Set when the tag is a user control
    pub user_control: Option<VirtualPath>,
}

#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    namespaces: Vec<TagNamespaceRegisterEntry>,
    user_controls: Vec<UserControlRegisterEntry>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the application-level registrations
    pub fn from_config(config: &ParserConfig) -> Result<Self> {
        let mut registry = TagRegistry::new();
        for entry in &config.tag_prefixes {
            match (&entry.namespace, &entry.tag_name, &entry.src) {
                (Some(namespace), _, _) => registry.register_namespace(TagNamespaceRegisterEntry {
                    tag_prefix: entry.tag_prefix.clone(),
                    namespace: namespace.clone(),
                    assembly: entry.assembly.clone(),
                }),
                (None, Some(tag_name), Some(src)) => registry.register_user_control(UserControlRegisterEntry {
                    tag_prefix: entry.tag_prefix.clone(),
                    tag_name: tag_name.clone(),
                    virtual_path: VirtualPath::new(src)?,
                }),
                _ => {
                    return Err(ParseError::new(
                        ErrorCode::MissingAttribute,
                        format!(
                            "The registration of tag prefix '{}' needs a namespace, or a tag name and a source.",
                            entry.tag_prefix
                        ),
                    ))
                }
            }
        }
        Ok(registry)
    }

    pub fn register_namespace(&mut self, entry: TagNamespaceRegisterEntry) {
        log::trace!("register prefix '{}' -> namespace {}", entry.tag_prefix, entry.namespace);
        self.namespaces.push(entry);
    }

    pub fn register_user_control(&mut self, entry: UserControlRegisterEntry) {
        log::trace!(
            "register '{}:{}' -> {}",
            entry.tag_prefix,
            entry.tag_name,
            entry.virtual_path
        );
        self.user_controls.retain(|e| {
            !(e.tag_prefix.eq_ignore_ascii_case(&entry.tag_prefix) && e.tag_name.eq_ignore_ascii_case(&entry.tag_name))
        });
        self.user_controls.push(entry);
    }

    pub fn namespaces(&self) -> &[TagNamespaceRegisterEntry] {
        &self.namespaces
    }

    pub fn user_controls(&self) -> &[UserControlRegisterEntry] {
        &self.user_controls
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.namespaces.iter().any(|e| e.tag_prefix.eq_ignore_ascii_case(prefix))
            || self.user_controls.iter().any(|e| e.tag_prefix.eq_ignore_ascii_case(prefix))
    }

    /// Resolve a server tag name (`asp:Label`, `uc:Header`, `div`)
    pub fn resolve(
        &self,
        registry: &TypeRegistry,
        type_resolution: &dyn TypeResolutionService,
        tag_name: &str,
        input_type: Option<&str>,
    ) -> Result<ResolvedTag> {
        let Some((prefix, name)) = tag_name.split_once(':') else {
            let type_name = html_control_type(tag_name, input_type);
            let type_id = registry.find(&type_name).ok_or_else(|| {
                ParseError::new(ErrorCode::TypeNotFound, format!("Could not load type '{}'.", type_name))
            })?;
            return Ok(ResolvedTag { type_id, user_control: None });
        };

        if let Some(entry) = self.user_controls.iter().find(|e| {
            e.tag_prefix.eq_ignore_ascii_case(prefix) && e.tag_name.eq_ignore_ascii_case(name)
        }) {
            let type_id = type_resolution
                .user_control_type(&entry.virtual_path)
                .and_then(|t| registry.find(&t))
                .or_else(|| registry.find(USER_CONTROL_TYPE))
                .ok_or_else(|| {
                    ParseError::new(ErrorCode::TypeNotFound, format!("Could not load type '{}'.", USER_CONTROL_TYPE))
                })?;
            return Ok(ResolvedTag {
                type_id,
                user_control: Some(entry.virtual_path.clone()),
            });
        }

        let mut known_prefix = false;
        for entry in self.namespaces.iter().filter(|e| e.tag_prefix.eq_ignore_ascii_case(prefix)) {
            known_prefix = true;
            if let Some(type_id) = registry.find_in_namespace(&entry.namespace, name) {
                return Ok(ResolvedTag { type_id, user_control: None });
            }
        }
        if !known_prefix && !self.has_prefix(prefix) {
            return Err(ParseError::new(
                ErrorCode::UnknownTagPrefix,
                format!("Unknown server tag prefix '{}' in '{}'.", prefix, tag_name),
            ));
        }
        Err(ParseError::new(
            ErrorCode::UnknownServerTag,
            format!("Unknown server tag '{}'.", tag_name),
        ))
    }
}
