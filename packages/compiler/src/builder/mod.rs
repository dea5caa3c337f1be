//! Builder Module
//!
//! The build tree: [`ControlBuilder`] nodes with their property, template,
//! bound and event entries, the specialised builder kinds and the no-compile
//! materialisation into live objects.

pub mod build_object;
pub mod code_block;
pub mod collection;
pub mod control_builder;
pub mod data_bound_literal;
pub mod object_tag;
pub mod persist_data;
pub mod property_entry;
pub mod template;

pub use build_object::{LiveObject, LiveValue, ObjectBuildContext};
pub use code_block::CodeBlockData;
pub use collection::CollectionData;
pub use control_builder::{BuilderKind, ChildBuilder, ControlBuilder, PropertyTarget, SubBuilder};
pub use object_tag::{ObjectTagData, ObjectTagScope};
pub use persist_data::{ObjectPersistData, PropertyEntryRef};
pub use property_entry::*;
pub use template::{current_template_control, TemplateControlInfo, TemplateControlScope, TemplateData, TemplateNode};

use crate::config::ParserConfig;
use crate::error::{ErrorCode, ParseError, Result};
use crate::expressions::ExpressionBuilderRegistry;
use crate::parser::filter::PageParserFilter;
use crate::parser::registry::{ResolvedTag, TagRegistry};
use crate::parser::services::{FilterResolutionService, TypeResolutionService};
use crate::parser::{CompilationMode, DocumentKind};
use crate::schema::TypeRegistry;
use crate::virtual_path::VirtualPath;

/// Everything a builder needs from the parse that creates it
pub struct BuildContext<'a> {
    pub registry: &'a TypeRegistry,
    pub config: &'a ParserConfig,
    pub expressions: &'a ExpressionBuilderRegistry,
    pub tags: &'a TagRegistry,
    pub type_resolution: &'a dyn TypeResolutionService,
    pub filter_resolution: &'a dyn FilterResolutionService,
    pub filter: Option<&'a dyn PageParserFilter>,
    pub compilation_mode: CompilationMode,
    pub document_kind: DocumentKind,
    pub in_designer: bool,
    pub virtual_path: &'a VirtualPath,
    /// Template control owning the document (for templates and local resources)
    pub template_control: TemplateControlInfo,
}

impl<'a> BuildContext<'a> {
    pub fn in_theme(&self) -> bool {
        self.document_kind == DocumentKind::PageTheme
    }

    pub fn no_compile(&self) -> bool {
        self.compilation_mode == CompilationMode::Never
    }

    /// Filter hooks that preprocess constructs are skipped in no-compile mode
    pub fn preprocessing_filter(&self) -> Option<&'a dyn PageParserFilter> {
        if self.no_compile() {
            None
        } else {
            self.filter
        }
    }

    /// Fail unless code constructs are allowed in this document
    pub fn ensure_code_allowed(&self) -> Result<()> {
        if !self.document_kind.policy().code_allowed {
            return Err(ParseError::new(
                ErrorCode::CodeNotAllowed,
                "Code blocks are not allowed in this file.",
            ));
        }
        if self.no_compile() {
            return Err(ParseError::new(
                ErrorCode::CompilationModeNever,
                "Code blocks are not supported when the compilation mode is Never.",
            ));
        }
        if let Some(filter) = self.filter {
            if !filter.allow_code() {
                return Err(ParseError::new(
                    ErrorCode::CodeNotAllowed,
                    "Code blocks are not allowed in this file.",
                ));
            }
        }
        Ok(())
    }

    pub fn resolve_tag(&self, tag_name: &str, input_type: Option<&str>) -> Result<ResolvedTag> {
        self.tags
            .resolve(self.registry, self.type_resolution, tag_name, input_type)
    }
}
