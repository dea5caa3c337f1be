//! Property Entries
//!
//! Metadata describing how one parsed attribute or nested element maps onto a
//! member of the control type. Entries are owned by their builder and keep
//! their insertion `index` so consumers can restore document order.

use super::control_builder::ControlBuilder;
use crate::parse_util::SourceLocation;
use crate::schema::PropertyValue;
use serde::Serialize;

/// Fields shared by every entry kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryHeader {
    /// Canonical dotted name (`Font.Bold`)
    pub name: String,
    /// Device filter, empty for the default
    pub filter: String,
    pub declaring_type: Option<String>,
    pub member_type: Option<String>,
    pub index: usize,
    pub read_only: bool,
    pub location: Option<SourceLocation>,
}

impl EntryHeader {
    pub fn new(filter: &str, name: &str) -> Self {
        EntryHeader {
            name: name.to_string(),
            filter: filter.to_string(),
            declaring_type: None,
            member_type: None,
            index: 0,
            read_only: false,
            location: None,
        }
    }

    /// Same filter and name (case-insensitive)
    pub fn same_slot(&self, other: &EntryHeader) -> bool {
        self.filter.eq_ignore_ascii_case(&other.filter) && self.name.eq_ignore_ascii_case(&other.name)
    }

    pub fn with_location(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }
}

/// An attribute converted to a member value, or passed through `SetAttribute`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplePropertyEntry {
    #[serde(flatten)]
    pub header: EntryHeader,
    pub persisted_value: String,
    pub value: PropertyValue,
    /// The control receives the raw string via its attribute accessor
    pub use_set_attribute: bool,
}

/// A nested element describing a complex property, or a collection item
#[derive(Debug, Clone, Serialize)]
pub struct ComplexPropertyEntry {
    #[serde(flatten)]
    pub header: EntryHeader,
    pub builder: ControlBuilder,
    pub is_collection_item: bool,
}

/// A nested element holding template markup
#[derive(Debug, Clone, Serialize)]
pub struct TemplatePropertyEntry {
    #[serde(flatten)]
    pub header: EntryHeader,
    pub builder: ControlBuilder,
    /// Template content may use two-way `Bind()`
    pub bindable: bool,
}

/// A `<%# ... %>` or `<%$ ... %>` attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundPropertyEntry {
    #[serde(flatten)]
    pub header: EntryHeader,
    /// Empty for databinding expressions
    pub expression_prefix: String,
    pub expression: String,
    /// Opaque result of the expression builder's parse step
    pub parsed_expression_data: Option<serde_json::Value>,
    pub two_way_bound: bool,
    pub read_only_property: bool,
    pub control_id: Option<String>,
    pub field_name: Option<String>,
    pub format_string: Option<String>,
    /// `<%#: ... %>` form
    pub encoded: bool,
    pub use_set_attribute: bool,
    /// Produced by the parser, not written in markup
    pub generated: bool,
}

impl BoundPropertyEntry {
    pub fn new(header: EntryHeader, expression_prefix: &str, expression: &str) -> Self {
        BoundPropertyEntry {
            header,
            expression_prefix: expression_prefix.to_string(),
            expression: expression.to_string(),
            parsed_expression_data: None,
            two_way_bound: false,
            read_only_property: false,
            control_id: None,
            field_name: None,
            format_string: None,
            encoded: false,
            use_set_attribute: false,
            generated: false,
        }
    }

    pub fn is_databinding(&self) -> bool {
        self.expression_prefix.is_empty()
    }
}

/// `OnClick="Handler"`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEntry {
    pub name: String,
    pub handler_method_name: String,
    pub index: usize,
    pub location: Option<SourceLocation>,
}

/// Insert `entry` into `entries`, replacing an earlier one in the same slot
pub(crate) fn collapse_into<T>(entries: &mut Vec<T>, entry: T, header: impl Fn(&T) -> &EntryHeader) {
    match entries.iter().position(|e| header(e).same_slot(header(&entry))) {
        Some(i) => entries[i] = entry,
        None => entries.push(entry),
    }
}
