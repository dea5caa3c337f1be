//! Object Persist Data
//!
//! A read-only view of everything a builder will set on the object it
//! creates, grouped the way consumers ask for it: by device filter, then by
//! property name.

use super::control_builder::{BuilderKind, ControlBuilder};
use super::property_entry::{
    BoundPropertyEntry, ComplexPropertyEntry, EntryHeader, EventEntry, SimplePropertyEntry,
    TemplatePropertyEntry,
};
use indexmap::IndexMap;

/// Any property entry
#[derive(Debug, Clone, Copy)]
pub enum PropertyEntryRef<'b> {
    Simple(&'b SimplePropertyEntry),
    Complex(&'b ComplexPropertyEntry),
    Template(&'b TemplatePropertyEntry),
    Bound(&'b BoundPropertyEntry),
}

impl<'b> PropertyEntryRef<'b> {
    pub fn header(&self) -> &'b EntryHeader {
        match *self {
            PropertyEntryRef::Simple(e) => &e.header,
            PropertyEntryRef::Complex(e) => &e.header,
            PropertyEntryRef::Template(e) => &e.header,
            PropertyEntryRef::Bound(e) => &e.header,
        }
    }
}

#[derive(Debug)]
pub struct ObjectPersistData<'b> {
    pub object_type: Option<&'b str>,
    pub is_collection: bool,
    pub resource_key: Option<&'b str>,
    pub localize: bool,
    /// Filter (lower-cased, empty for default) to name (lower-cased) to entry
    filtered: IndexMap<String, IndexMap<String, PropertyEntryRef<'b>>>,
    pub bound_entries: Vec<&'b BoundPropertyEntry>,
    pub events: Vec<&'b EventEntry>,
    pub collection_items: Vec<&'b ControlBuilder>,
}

impl<'b> ObjectPersistData<'b> {
    pub fn new(builder: &'b ControlBuilder) -> Self {
        let mut entries: Vec<PropertyEntryRef<'b>> = Vec::new();
        entries.extend(builder.simple_properties.iter().map(PropertyEntryRef::Simple));
        entries.extend(
            builder
                .complex_properties
                .iter()
                .filter(|e| !e.is_collection_item)
                .map(PropertyEntryRef::Complex),
        );
        entries.extend(builder.template_properties.iter().map(PropertyEntryRef::Template));
        entries.extend(builder.bound_properties.iter().map(PropertyEntryRef::Bound));
        entries.sort_by_key(|e| e.header().index);

        let mut filtered: IndexMap<String, IndexMap<String, PropertyEntryRef<'b>>> = IndexMap::new();
        for entry in entries {
            let header = entry.header();
            filtered
                .entry(header.filter.to_ascii_lowercase())
                .or_default()
                .insert(header.name.to_ascii_lowercase(), entry);
        }

        let mut bound_entries: Vec<_> = builder.bound_properties.iter().collect();
        bound_entries.sort_by_key(|e| e.header.index);

        ObjectPersistData {
            object_type: builder.type_name.as_deref(),
            is_collection: matches!(builder.kind, BuilderKind::Collection(_)),
            resource_key: builder.resource_key.as_deref(),
            localize: builder.localize,
            filtered,
            bound_entries,
            events: builder.events.iter().collect(),
            collection_items: builder.collection_items().collect(),
        }
    }

    /// Device filters in first-use order; the default filter is the empty string
    pub fn filters(&self) -> impl Iterator<Item = &str> {
        self.filtered.keys().map(String::as_str)
    }

    /// Entries for one filter in document order, last write per name
    pub fn entries_for_filter(&self, filter: &str) -> Vec<PropertyEntryRef<'b>> {
        self.filtered
            .get(&filter.to_ascii_lowercase())
            .map(|m| m.values().copied().collect())
            .unwrap_or_default()
    }

    /// Default-filter entries
    pub fn all_property_entries(&self) -> Vec<PropertyEntryRef<'b>> {
        self.entries_for_filter("")
    }

    pub fn get_filtered(&self, filter: &str, name: &str) -> Option<PropertyEntryRef<'b>> {
        self.filtered
            .get(&filter.to_ascii_lowercase())?
            .get(&name.to_ascii_lowercase())
            .copied()
    }

    pub fn get(&self, name: &str) -> Option<PropertyEntryRef<'b>> {
        self.get_filtered("", name)
    }

    /// Bound entries that are `<%# %>` databindings
    pub fn databinding_entries(&self) -> Vec<&'b BoundPropertyEntry> {
        self.bound_entries.iter().copied().filter(|e| e.is_databinding()).collect()
    }
}

impl ControlBuilder {
    pub fn persist_data(&self) -> ObjectPersistData<'_> {
        ObjectPersistData::new(self)
    }
}
