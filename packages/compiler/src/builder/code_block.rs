//! Code Block Builder
//!
//! Leaf builder for `<% %>`, `<%= %>`, `<%: %>` and `<%# %>` fragments.

use super::control_builder::{BuilderKind, ControlBuilder};
use crate::markup::patterns::{BIND_EXPRESSION, BIND_ITEM_EXPRESSION, EVAL_EXPRESSION};
use crate::markup::CodeBlockType;
use crate::parse_util::SourceLocation;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeBlockData {
    pub block_type: CodeBlockType,
    pub content: String,
    /// `<%#: %>`
    pub encode: bool,
}

impl CodeBlockData {
    /// Two-way `Bind(...)` or `BindItem.Field`
    pub fn is_bind(&self) -> bool {
        self.block_type == CodeBlockType::DataBinding
            && (BIND_EXPRESSION.is_match(&self.content) || BIND_ITEM_EXPRESSION.is_match(&self.content))
    }

    pub fn is_eval(&self) -> bool {
        self.block_type == CodeBlockType::DataBinding && EVAL_EXPRESSION.is_match(&self.content)
    }
}

impl ControlBuilder {
    pub fn code_block(
        block_type: CodeBlockType,
        content: &str,
        encode: bool,
        location: Option<SourceLocation>,
    ) -> ControlBuilder {
        let mut builder = ControlBuilder::new(
            BuilderKind::CodeBlock(CodeBlockData {
                block_type,
                content: content.to_string(),
                encode,
            }),
            "",
        );
        builder.location = location;
        builder.closed = true;
        builder
    }

    pub fn code_block_data(&self) -> Option<&CodeBlockData> {
        match &self.kind {
            BuilderKind::CodeBlock(data) => Some(data),
            _ => None,
        }
    }
}
