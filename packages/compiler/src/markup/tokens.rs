//! Markup Tokens
//!
//! Lexical units produced by the markup lexer. Every token carries the byte
//! range it covers in its document.

use serde::Serialize;

/// Code block flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CodeBlockType {
    /// `<% ... %>`
    Code,
    /// `<%= ... %>`
    Expression,
    /// `<%# ... %>`
    DataBinding,
    /// `<%: ... %>`
    EncodedExpression,
}

/// A raw attribute as written in the markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawAttribute {
    pub name: String,
    pub value: String,
    /// Whether an `=` followed the name (directives use this to find their name)
    pub has_equals: bool,
    /// Byte offset of the value in the document
    pub value_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// Plain text up to the next `<`
    Text(String),
    /// `<%@ ... %>`
    Directive { attributes: Vec<RawAttribute> },
    /// `<!-- #include file="..." -->`
    Include { path_type: String, file_name: String },
    /// `<%-- ... --%>`
    Comment,
    CodeBlock {
        block_type: CodeBlockType,
        code: String,
        /// `<%#: %>` form
        encode: bool,
        /// Byte offset of the code in the document
        code_offset: usize,
    },
    BeginTag {
        name: String,
        attributes: Vec<RawAttribute>,
        self_closed: bool,
    },
    EndTag { name: String },
    /// A `<` that starts no recognised construct
    Stray,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Token { kind, start, end }
    }
}
