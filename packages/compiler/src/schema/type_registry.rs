//! Type Registry
//!
//! The typed member registry the parser binds markup against. Every type is
//! described ahead of time by a compact schema line:
//!
//! ```text
//! FullName[^Base][{trait;trait}]|member,member,...
//! ```
//!
//! Traits:
//! - `props`: children are parsed as properties
//! - `default=Prop`: default property absorbing child elements
//! - `item=Type`: an `Item` indexer (repeat for overloads)
//! - `implements=A/B`: implemented interfaces
//! - `value=kind`: string conversion kind (`string`, `bool`, `int`, `uint`, `double`,
//!   `unit`, `fontunit`, `color`, `object`)
//! - `values=A/B/C`: enum members (`flags` makes it a flags enum)
//! - `noncls`, `interface`, `comclassic`, `cached`, `ignoreunknown`, `nows`, `decode`
//! - `innertext=Prop`: the control receives its raw inner text
//! - `asm=Name`, `guid=...`, `progid=...`
//!
//! Member prefixes:
//! - (no prefix): read/write property
//! - `=`: read-only property
//! - `.`: field
//! - `*`: event
//! - `~`: template property supporting two-way binding
//!
//! A member may carry `:Type` (default `String`), `@Container` (template
//! container type) and a trailing `!` (template instantiated once, so it
//! shares its parent's ID scope). Types are referenced by full name or by a
//! unique simple name.

use bitflags::bitflags;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Index of a type in its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        const CHILDREN_AS_PROPERTIES = 1 << 0;
        const NOT_CLS_COMPLIANT = 1 << 1;
        const INTERFACE = 1 << 2;
        const COM_CLASSIC = 1 << 3;
        const PARTIAL_CACHING = 1 << 4;
        const IGNORE_UNKNOWN_CONTENT = 1 << 5;
        const FLAGS_ENUM = 1 << 6;
        const NO_WHITESPACE_LITERALS = 1 << 7;
        const HTML_DECODE_LITERALS = 1 << 8;
    }
}

/// How a string attribute value converts to a value of the type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKind {
    /// No string conversion (complex types)
    None,
    String,
    Boolean,
    Int32,
    UInt32,
    Double,
    Unit,
    FontUnit,
    Color,
    Enum,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemberKind {
    Property,
    Field,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberDescriptor {
    pub name: String,
    pub kind: MemberKind,
    pub member_type: TypeId,
    pub declaring_type: TypeId,
    pub writable: bool,
    /// Container type passed to an `ITemplate` property
    pub template_container: Option<TypeId>,
    /// Template content may use two-way `Bind()` expressions
    pub bindable_template: bool,
    /// Template is instantiated once (shares the naming scope of its parent)
    pub single_instance: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeDescriptor {
    pub id: TypeId,
    pub full_name: String,
    pub name: String,
    pub namespace: String,
    pub assembly: Option<String>,
    pub base: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    #[serde(skip)]
    pub flags: TypeFlags,
    pub value_kind: ValueKind,
    pub enum_values: Vec<String>,
    pub default_property: Option<String>,
    /// Item indexer overloads declared on this type
    pub item_types: Vec<TypeId>,
    pub inner_text_property: Option<String>,
    pub guid: Option<String>,
    pub progid: Option<String>,
    pub members: Vec<MemberDescriptor>,
    pub events: Vec<String>,
}

impl TypeDescriptor {
    pub fn has_flag(&self, flag: TypeFlags) -> bool {
        self.flags.contains(flag)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    #[error("malformed schema line '{0}'")]
    MalformedLine(String),
    #[error("unknown trait '{trait_name}' on type '{type_name}'")]
    UnknownTrait { type_name: String, trait_name: String },
    #[error("type '{0}' is declared twice")]
    DuplicateType(String),
    #[error("type reference '{reference}' in '{type_name}' does not resolve")]
    UnresolvedType { type_name: String, reference: String },
    #[error("type reference '{0}' is ambiguous")]
    AmbiguousType(String),
}

/// Type registry, immutable once built
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_full_name: HashMap<String, TypeId>,
    by_simple_name: HashMap<String, Vec<TypeId>>,
}

/// Raw schema line, before type references are resolved
struct PendingType {
    full_name: String,
    base: Option<String>,
    traits: Vec<String>,
    members: Vec<String>,
}

impl TypeRegistry {
    /// Build a registry from schema lines
    pub fn from_schema<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self, RegistryError> {
        let mut pending = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            pending.push(parse_line(line)?);
        }

        let mut registry = TypeRegistry::default();
        // first pass: declare every name so members can reference later types
        for (index, p) in pending.iter().enumerate() {
            let id = TypeId(index as u32);
            let key = p.full_name.to_ascii_lowercase();
            if registry.by_full_name.insert(key, id).is_some() {
                return Err(RegistryError::DuplicateType(p.full_name.clone()));
            }
            let (namespace, name) = match p.full_name.rfind('.') {
                Some(dot) => (&p.full_name[..dot], &p.full_name[dot + 1..]),
                None => ("", p.full_name.as_str()),
            };
            registry
                .by_simple_name
                .entry(name.to_ascii_lowercase())
                .or_default()
                .push(id);
            registry.types.push(TypeDescriptor {
                id,
                full_name: p.full_name.clone(),
                name: name.to_string(),
                namespace: namespace.to_string(),
                assembly: None,
                base: None,
                interfaces: Vec::new(),
                flags: TypeFlags::empty(),
                value_kind: ValueKind::None,
                enum_values: Vec::new(),
                default_property: None,
                item_types: Vec::new(),
                inner_text_property: None,
                guid: None,
                progid: None,
                members: Vec::new(),
                events: Vec::new(),
            });
        }

        // second pass: resolve references
        for (index, p) in pending.iter().enumerate() {
            let id = TypeId(index as u32);
            let mut desc = registry.types[index].clone();
            if let Some(base) = &p.base {
                desc.base = Some(registry.resolve_reference(&p.full_name, base)?);
            }
            for t in &p.traits {
                registry.apply_trait(&mut desc, t)?;
            }
            for m in &p.members {
                registry.add_member(&mut desc, id, m)?;
            }
            registry.types[index] = desc;
        }
        Ok(registry)
    }

    fn resolve_reference(&self, owner: &str, reference: &str) -> Result<TypeId, RegistryError> {
        self.find(reference).ok_or_else(|| {
            if self.by_simple_name.get(&reference.to_ascii_lowercase()).map_or(0, Vec::len) > 1 {
                RegistryError::AmbiguousType(reference.to_string())
            } else {
                RegistryError::UnresolvedType {
                    type_name: owner.to_string(),
                    reference: reference.to_string(),
                }
            }
        })
    }

    fn apply_trait(&self, desc: &mut TypeDescriptor, t: &str) -> Result<(), RegistryError> {
        let (key, value) = match t.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (t.trim(), None),
        };
        match (key, value) {
            ("props", None) => desc.flags |= TypeFlags::CHILDREN_AS_PROPERTIES,
            ("noncls", None) => desc.flags |= TypeFlags::NOT_CLS_COMPLIANT,
            ("interface", None) => desc.flags |= TypeFlags::INTERFACE,
            ("comclassic", None) => desc.flags |= TypeFlags::COM_CLASSIC,
            ("cached", None) => desc.flags |= TypeFlags::PARTIAL_CACHING,
            ("ignoreunknown", None) => desc.flags |= TypeFlags::IGNORE_UNKNOWN_CONTENT,
            ("nows", None) => desc.flags |= TypeFlags::NO_WHITESPACE_LITERALS,
            ("decode", None) => desc.flags |= TypeFlags::HTML_DECODE_LITERALS,
            ("flags", None) => desc.flags |= TypeFlags::FLAGS_ENUM,
            ("default", Some(v)) => desc.default_property = Some(v.to_string()),
            ("innertext", Some(v)) => desc.inner_text_property = Some(v.to_string()),
            ("asm", Some(v)) => desc.assembly = Some(v.to_string()),
            ("guid", Some(v)) => desc.guid = Some(v.to_string()),
            ("progid", Some(v)) => desc.progid = Some(v.to_string()),
            ("item", Some(v)) => {
                let item = self.resolve_reference(&desc.full_name, v)?;
                desc.item_types.push(item);
            }
            ("implements", Some(v)) => {
                for iface in v.split('/') {
                    let iface = self.resolve_reference(&desc.full_name, iface)?;
                    desc.interfaces.push(iface);
                }
            }
            ("values", Some(v)) => {
                desc.value_kind = ValueKind::Enum;
                desc.enum_values = v.split('/').map(str::to_string).collect();
            }
            ("value", Some(v)) => {
                desc.value_kind = match v {
                    "string" => ValueKind::String,
                    "bool" => ValueKind::Boolean,
                    "int" => ValueKind::Int32,
                    "uint" => ValueKind::UInt32,
                    "double" => ValueKind::Double,
                    "unit" => ValueKind::Unit,
                    "fontunit" => ValueKind::FontUnit,
                    "color" => ValueKind::Color,
                    "object" => ValueKind::Object,
                    _ => {
                        return Err(RegistryError::UnknownTrait {
                            type_name: desc.full_name.clone(),
                            trait_name: t.to_string(),
                        })
                    }
                }
            }
            _ => {
                return Err(RegistryError::UnknownTrait {
                    type_name: desc.full_name.clone(),
                    trait_name: t.to_string(),
                })
            }
        }
        Ok(())
    }

    fn add_member(&self, desc: &mut TypeDescriptor, id: TypeId, spec: &str) -> Result<(), RegistryError> {
        if let Some(event) = spec.strip_prefix('*') {
            desc.events.push(event.to_string());
            return Ok(());
        }
        let (kind, writable, bindable, rest) = match spec.chars().next() {
            Some('=') => (MemberKind::Property, false, false, &spec[1..]),
            Some('.') => (MemberKind::Field, true, false, &spec[1..]),
            Some('~') => (MemberKind::Property, true, true, &spec[1..]),
            _ => (MemberKind::Property, true, false, spec),
        };
        let (rest, single_instance) = match rest.strip_suffix('!') {
            Some(r) => (r, true),
            None => (rest, false),
        };
        let (rest, container) = match rest.split_once('@') {
            Some((r, c)) => (r, Some(self.resolve_reference(&desc.full_name, c)?)),
            None => (rest, None),
        };
        let (name, type_ref) = match rest.split_once(':') {
            Some((n, t)) => (n, t),
            None => (rest, "System.String"),
        };
        if name.is_empty() {
            return Err(RegistryError::MalformedLine(spec.to_string()));
        }
        desc.members.push(MemberDescriptor {
            name: name.to_string(),
            kind,
            member_type: self.resolve_reference(&desc.full_name, type_ref)?,
            declaring_type: id,
            writable,
            template_container: container,
            bindable_template: bindable,
            single_instance,
        });
        Ok(())
    }

    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.types[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Look a type up by full name, or by simple name when that is unique
    pub fn find(&self, name: &str) -> Option<TypeId> {
        let key = name.trim().to_ascii_lowercase();
        if let Some(id) = self.by_full_name.get(&key) {
            return Some(*id);
        }
        match self.by_simple_name.get(&key) {
            Some(ids) if ids.len() == 1 => Some(ids[0]),
            _ => None,
        }
    }

    /// Look a type up inside a namespace (tag prefix resolution)
    pub fn find_in_namespace(&self, namespace: &str, name: &str) -> Option<TypeId> {
        self.by_simple_name.get(&name.to_ascii_lowercase())?.iter().copied().find(|id| {
            self.get(*id).namespace.eq_ignore_ascii_case(namespace)
        })
    }

    pub fn full_name(&self, id: TypeId) -> &str {
        &self.get(id).full_name
    }

    /// The type followed by its base types, most derived first
    pub fn ancestors(&self, id: TypeId) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        std::iter::successors(Some(self.get(id)), move |t| t.base.map(|b| self.get(b)))
    }

    /// True when a value of `from` can be stored where `to` is expected
    pub fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to || self.get(to).full_name == "System.Object" {
            return true;
        }
        self.ancestors(from).any(|t| {
            t.id == to || t.interfaces.iter().any(|i| *i == to || self.is_assignable(*i, to))
        })
    }

    /// True when `id` derives from (or implements) the named type
    pub fn is_a(&self, id: TypeId, name: &str) -> bool {
        self.find(name).map_or(false, |target| self.is_assignable(id, target))
    }

    pub fn is_control(&self, id: TypeId) -> bool {
        self.is_a(id, "System.Web.UI.Control")
    }

    pub fn has_flag(&self, id: TypeId, flag: TypeFlags) -> bool {
        self.get(id).has_flag(flag)
    }

    /// First flag match on the type or any of its base types
    pub fn inherits_flag(&self, id: TypeId, flag: TypeFlags) -> bool {
        self.ancestors(id).any(|t| t.has_flag(flag))
    }

    /// Nearest declared default property
    pub fn default_property(&self, id: TypeId) -> Option<&str> {
        self.ancestors(id).find_map(|t| t.default_property.as_deref())
    }

    /// Nearest declared inner-text property
    pub fn inner_text_property(&self, id: TypeId) -> Option<&str> {
        self.ancestors(id).find_map(|t| t.inner_text_property.as_deref())
    }

    /// Nearest declared event with this name (case-insensitive)
    pub fn find_event(&self, id: TypeId, name: &str) -> Option<&str> {
        self.ancestors(id)
            .flat_map(|t| t.events.iter())
            .find(|e| e.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Every member named `name`, grouped by declaring level, most derived level first
    pub fn members_by_level(&self, id: TypeId, name: &str, kind: MemberKind) -> Vec<Vec<&MemberDescriptor>> {
        self.ancestors(id)
            .map(|t| {
                t.members
                    .iter()
                    .filter(|m| m.kind == kind && m.name.eq_ignore_ascii_case(name))
                    .collect::<Vec<_>>()
            })
            .filter(|level| !level.is_empty())
            .collect()
    }

    /// Types whose full name starts with the namespace, in declaration order
    pub fn types_in_namespace<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a TypeDescriptor> + 'a {
        self.types.iter().filter(move |t| t.namespace.eq_ignore_ascii_case(namespace))
    }
}

fn parse_line(line: &str) -> Result<PendingType, RegistryError> {
    let (head, members) = line
        .split_once('|')
        .ok_or_else(|| RegistryError::MalformedLine(line.to_string()))?;
    let (head, traits) = match head.find('{') {
        Some(open) => {
            let close = head
                .rfind('}')
                .filter(|c| *c > open)
                .ok_or_else(|| RegistryError::MalformedLine(line.to_string()))?;
            let traits = head[open + 1..close]
                .split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            (&head[..open], traits)
        }
        None => (head, Vec::new()),
    };
    let (full_name, base) = match head.split_once('^') {
        Some((n, b)) => (n.trim(), Some(b.trim().to_string())),
        None => (head.trim(), None),
    };
    if full_name.is_empty() {
        return Err(RegistryError::MalformedLine(line.to_string()));
    }
    Ok(PendingType {
        full_name: full_name.to_string(),
        base,
        traits,
        members: members
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect(),
    })
}
