//! Parsed Documents
//!
//! The result of parsing one markup file: the build tree plus everything the
//! directives, script blocks and object tags contributed.

use super::kind::{CompilationMode, DocumentKind};
use super::registry::{TagNamespaceRegisterEntry, UserControlRegisterEntry};
use crate::builder::{ControlBuilder, LiveObject, ObjectBuildContext, ObjectTagScope};
use crate::error::{ErrorCode, ParseError, Result};
use crate::parse_util::SourceLocation;
use crate::virtual_path::VirtualPath;
use indexmap::IndexMap;
use serde::Serialize;

/// A `<script runat="server">` block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<VirtualPath>,
    pub content: String,
    pub location: SourceLocation,
}

/// A type named either directly or through the document that defines it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeReference {
    TypeName(String),
    VirtualPath(VirtualPath),
}

/// Settings taken from the main directive
#[derive(Debug, Clone, Default, Serialize)]
pub struct MainDirectiveSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_file: Option<VirtualPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_file_base_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<VirtualPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_pragmas: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler_options: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_event_wireup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_view_state: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_theming: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_page_file: Option<VirtualPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stylesheet_theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_schema: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
    pub virtual_path: VirtualPath,
    pub kind: DocumentKind,
    pub compilation_mode: CompilationMode,
    /// Full name of the type the generated class derives from
    pub base_type: String,
    pub directive: MainDirectiveSettings,
    pub root: ControlBuilder,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assembly_dependencies: Vec<String>,
    /// Files the document depends on (includes, user controls, script sources)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_dependencies: Vec<VirtualPath>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub type_dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub implemented_interfaces: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_namespaces: Vec<TagNamespaceRegisterEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_controls: Vec<UserControlRegisterEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub script_blocks: Vec<ScriptBlock>,
    /// Page and app-instance scoped object tags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub page_objects: Vec<ControlBuilder>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub session_objects: Vec<ControlBuilder>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub application_objects: Vec<ControlBuilder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cache: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_type: Option<TypeReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page_type: Option<TypeReference>,
    /// IDs of the `ContentPlaceHolder` controls, in document order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content_placeholders: Vec<String>,
    /// `ContentPlaceHolderID` of each top-level `Content` control
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content_regions: Vec<String>,
}

impl ParsedDocument {
    pub fn new(virtual_path: VirtualPath, kind: DocumentKind, root: ControlBuilder) -> Self {
        ParsedDocument {
            virtual_path,
            kind,
            compilation_mode: CompilationMode::default(),
            base_type: kind.policy().default_base_type.to_string(),
            directive: MainDirectiveSettings::default(),
            root,
            imports: Vec::new(),
            assembly_dependencies: Vec::new(),
            source_dependencies: Vec::new(),
            type_dependencies: Vec::new(),
            implemented_interfaces: Vec::new(),
            tag_namespaces: Vec::new(),
            user_controls: Vec::new(),
            script_blocks: Vec::new(),
            page_objects: Vec::new(),
            session_objects: Vec::new(),
            application_objects: Vec::new(),
            output_cache: None,
            master_type: None,
            previous_page_type: None,
            content_placeholders: Vec::new(),
            content_regions: Vec::new(),
        }
    }

    pub fn is_content_page(&self) -> bool {
        self.directive.master_page_file.is_some()
    }

    pub fn add_source_dependency(&mut self, virtual_path: VirtualPath) {
        if !self.source_dependencies.contains(&virtual_path) {
            self.source_dependencies.push(virtual_path);
        }
    }

    pub fn add_type_dependency(&mut self, type_name: &str) {
        if !self.type_dependencies.iter().any(|t| t == type_name) {
            self.type_dependencies.push(type_name.to_string());
        }
    }

    /// File an object tag under its (already resolved) scope
    pub fn add_object_tag(&mut self, builder: ControlBuilder) {
        let scope = builder.object_tag_data().map_or(ObjectTagScope::Page, |d| d.scope);
        match scope {
            ObjectTagScope::Session => self.session_objects.push(builder),
            ObjectTagScope::Application => self.application_objects.push(builder),
            _ => self.page_objects.push(builder),
        }
    }

    /// Every content region of this page must name a placeholder of `master`
    pub fn validate_content_against_master(&self, master: &ParsedDocument) -> Result<()> {
        for region in &self.content_regions {
            let found = master
                .content_placeholders
                .iter()
                .any(|p| p.eq_ignore_ascii_case(region));
            if !found {
                return Err(ParseError::new(
                    ErrorCode::ContentPlaceHolderNotFound,
                    format!(
                        "Cannot find ContentPlaceHolder '{}' in the master page '{}', verify content control's ContentPlaceHolderID attribute in the content page.",
                        region, master.virtual_path
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Materialise the tree without compiling it
    pub fn build_object(&self, ctx: &ObjectBuildContext) -> Result<LiveObject> {
        let mut object = self.root.build_object(ctx)?;
        object.type_name = self.base_type.clone();
        Ok(object)
    }
}
