//! Parser Module
//!
//! The template parser engine and everything it consults while reading a
//! document: the per-kind policy, directives, the tag prefix registry, host
//! services, the page parser filter and parse recorders.

pub mod context;
mod directives;
pub mod document;
pub mod filter;
pub mod kind;
pub mod recorder;
pub mod registry;
pub mod services;
pub mod template_parser;

pub use context::ParseContext;
pub use document::{MainDirectiveSettings, ParsedDocument, ScriptBlock, TypeReference};
pub use filter::{ConfiguredFilter, FilterCounters, PageParserFilter};
pub use kind::{CompilationMode, DocumentKind, ParserPolicy};
pub use recorder::{CompositeRecorder, NullRecorder, ParseRecorder};
pub use registry::{ResolvedTag, TagNamespaceRegisterEntry, TagRegistry, UserControlRegisterEntry};
pub use services::{
    DefaultTypeResolution, FileSystemPathProvider, FilterResolutionService, InMemoryPathProvider,
    TypeResolutionService, VirtualPathProvider,
};
pub use template_parser::{parse_document, ParserOptions, TemplateParser};
