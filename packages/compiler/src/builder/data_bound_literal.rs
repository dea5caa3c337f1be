//! Data-Bound Literal Builder
//!
//! Literal text interleaved with `<%# %>` expressions. The sub-builders
//! strictly alternate literal, binding, literal, ... and always start and end
//! with a literal; empty literals are inserted to keep the alternation, so a
//! builder with `n` sub-builders has `n / 2 + 1` literals and `n / 2`
//! bindings.

use super::control_builder::{BuilderKind, ControlBuilder, SubBuilder};
use crate::parse_util::SourceLocation;

impl ControlBuilder {
    pub fn data_bound_literal(location: Option<SourceLocation>) -> ControlBuilder {
        let mut builder = ControlBuilder::new(BuilderKind::DataBoundLiteral, "");
        builder.location = location;
        builder.sub_builders.push(SubBuilder::Literal(String::new()));
        builder
    }

    pub(crate) fn add_bound_literal_string(&mut self, text: &str) {
        match self.sub_builders.last_mut() {
            Some(SubBuilder::Literal(last)) => last.push_str(text),
            _ => self.sub_builders.push(SubBuilder::Literal(text.to_string())),
        }
    }

    pub(crate) fn add_data_binding(&mut self, code_block: ControlBuilder) {
        if !matches!(self.sub_builders.last(), Some(SubBuilder::Literal(_))) {
            self.sub_builders.push(SubBuilder::Literal(String::new()));
        }
        self.sub_builders.push(SubBuilder::Builder(Box::new(code_block)));
        self.sub_builders.push(SubBuilder::Literal(String::new()));
    }

    pub fn static_literals_count(&self) -> usize {
        self.sub_builders
            .iter()
            .filter(|s| matches!(s, SubBuilder::Literal(_)))
            .count()
    }

    pub fn data_bound_literal_count(&self) -> usize {
        self.sub_builders
            .iter()
            .filter(|s| matches!(s, SubBuilder::Builder(_)))
            .count()
    }

    /// Literal segments in order, including the empty ones
    pub fn static_literals(&self) -> Vec<&str> {
        self.sub_builders
            .iter()
            .filter_map(|s| match s {
                SubBuilder::Literal(text) => Some(text.as_str()),
                SubBuilder::Builder(_) => None,
            })
            .collect()
    }

    /// Binding expressions in order
    pub fn data_bound_expressions(&self) -> Vec<&str> {
        self.sub_builders
            .iter()
            .filter_map(|s| match s {
                SubBuilder::Builder(b) => b.code_block_data().map(|d| d.content.as_str()),
                SubBuilder::Literal(_) => None,
            })
            .collect()
    }
}
