#![deny(clippy::all)]

//! ASP.NET Web Forms markup compiler front end
//!
//! Parses `.aspx`, `.ascx`, `.master`, `.skin` and `.asax` documents into a
//! tree of control builders bound against a typed member registry.

// Core modules
pub mod config;
pub mod error;
pub mod expressions;
pub mod parse_util;
pub mod virtual_path;

// Lexing and parsing
pub mod markup;
pub mod parser;

// Build tree and type metadata
pub mod builder;
pub mod schema;

pub use builder::{BuilderKind, ControlBuilder, LiveObject, ObjectBuildContext, ObjectPersistData};
pub use config::ParserConfig;
pub use error::{ErrorCode, ParseError, ParseErrorKind, Result};
pub use expressions::{ExpressionBuilder, ExpressionBuilderRegistry};
pub use parser::{parse_document, DocumentKind, ParsedDocument, ParserOptions, TemplateParser};
pub use schema::TypeRegistry;
pub use virtual_path::VirtualPath;
