//! Markup Module
//!
//! Lexical layer of the parser: pattern set, tokens, the pull lexer, the
//! attribute bag and the HTML control tables.

pub mod attributes;
pub mod html_tags;
pub mod lexer;
pub mod patterns;
pub mod tokens;

pub use attributes::{parse_property_device_filter, ParsedAttribute, ParsedAttributeCollection};
pub use lexer::{LexMode, Lexer};
pub use tokens::{CodeBlockType, RawAttribute, Token, TokenKind};
