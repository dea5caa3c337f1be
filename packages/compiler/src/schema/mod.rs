//! Schema Module
//!
//! Typed member registry that replaces runtime reflection: type
//! descriptors, the built-in framework schema, dotted property resolution
//! and string value conversion.

pub mod builtin_schema;
pub mod converter;
pub mod property_mapper;
pub mod type_registry;

pub use builtin_schema::{BUILTIN_REGISTRY, BUILTIN_SCHEMA};
pub use converter::{convert_value, PropertyValue};
pub use property_mapper::{find_member, get_member_info, MemberInfo};
pub use type_registry::*;
