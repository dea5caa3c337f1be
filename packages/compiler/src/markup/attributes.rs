//! Parsed Attributes
//!
//! An ordered attribute bag that keeps the device filter of every attribute
//! (`ie:Text="..."` is the `Text` attribute filtered for `ie`).

use serde::Serialize;

/// Split a possibly device-filtered name into `(filter, name)`.
///
/// `"ie:Text"` gives `("ie", "Text")`; names without a colon get an empty filter.
pub fn parse_property_device_filter(name: &str) -> (String, String) {
    match name.find(':') {
        Some(i) if i > 0 && i + 1 < name.len() => (name[..i].to_string(), name[i + 1..].to_string()),
        _ => (String::new(), name.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedAttribute {
    pub filter: String,
    pub name: String,
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl ParsedAttribute {
    /// Name as written, including the filter
    pub fn full_name(&self) -> String {
        if self.filter.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.filter, self.name)
        }
    }
}

/// Ordered, case-insensitive attribute collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParsedAttributeCollection {
    attributes: Vec<ParsedAttribute>,
}

impl ParsedAttributeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute; returns `Err(full_name)` when the same filter and name already exist
    pub fn add_filtered_attribute(
        &mut self,
        filter: &str,
        name: &str,
        value: &str,
    ) -> Result<(), String> {
        self.add_with_position(filter, name, value, 0, 0)
    }

    pub fn add_with_position(
        &mut self,
        filter: &str,
        name: &str,
        value: &str,
        line: usize,
        column: usize,
    ) -> Result<(), String> {
        if self.find(filter, name).is_some() {
            let attr = ParsedAttribute {
                filter: filter.to_string(),
                name: name.to_string(),
                value: String::new(),
                line,
                column,
            };
            return Err(attr.full_name());
        }
        self.attributes.push(ParsedAttribute {
            filter: filter.to_string(),
            name: name.to_string(),
            value: value.to_string(),
            line,
            column,
        });
        Ok(())
    }

    /// Set an unfiltered attribute, replacing any existing value
    pub fn set(&mut self, name: &str, value: &str) {
        match self.find("", name) {
            Some(i) => self.attributes[i].value = value.to_string(),
            None => self.attributes.push(ParsedAttribute {
                filter: String::new(),
                name: name.to_string(),
                value: value.to_string(),
                line: 0,
                column: 0,
            }),
        }
    }

    fn find(&self, filter: &str, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| {
            a.filter.eq_ignore_ascii_case(filter) && a.name.eq_ignore_ascii_case(name)
        })
    }

    /// Unfiltered attribute value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find("", name).map(|i| self.attributes[i].value.as_str())
    }

    pub fn get_filtered(&self, filter: &str, name: &str) -> Option<&str> {
        self.find(filter, name).map(|i| self.attributes[i].value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find("", name).is_some()
    }

    /// Remove and return an unfiltered attribute
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.find("", name).map(|i| self.attributes.remove(i).value)
    }

    /// Drop every attribute carrying `filter` (e.g. all `meta:` attributes)
    pub fn clear_filter(&mut self, filter: &str) {
        self.attributes.retain(|a| !a.filter.eq_ignore_ascii_case(filter));
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedAttribute> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attributes grouped by filter, groups in order of first appearance
    pub fn filtered_groups(&self) -> Vec<(String, Vec<&ParsedAttribute>)> {
        let mut groups: Vec<(String, Vec<&ParsedAttribute>)> = Vec::new();
        for attr in &self.attributes {
            match groups.iter_mut().find(|(f, _)| f.eq_ignore_ascii_case(&attr.filter)) {
                Some((_, group)) => group.push(attr),
                None => groups.push((attr.filter.clone(), vec![attr])),
            }
        }
        groups
    }
}
