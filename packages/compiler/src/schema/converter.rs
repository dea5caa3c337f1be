//! Property Converter
//!
//! Converts persisted attribute strings into typed values according to the
//! member type's [`ValueKind`].

use super::type_registry::{TypeFlags, TypeId, TypeRegistry, ValueKind};
use crate::error::{ErrorCode, ParseError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// A converted attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum PropertyValue {
    Null,
    String(String),
    Bool(bool),
    Int(i32),
    UInt(u32),
    Double(f64),
    /// Canonical enum member name(s), comma separated for flags
    Enum(String),
    Unit { value: f64, unit: String },
    /// Named font size (`Small`, `XLarge`...) or a unit
    FontUnit(String),
    /// Known color name or `#RRGGBB`
    Color(String),
}

static UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<value>-?\d+(?:\.\d+)?)\s*(?P<unit>px|pt|pc|in|mm|cm|%|em|ex)?$").unwrap()
});

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

const FONT_SIZES: &[&str] = &[
    "Smaller", "Larger", "XXSmall", "XSmall", "Small", "Medium", "Large", "XLarge", "XXLarge",
];

const COLOR_NAMES: &[&str] = &[
    "Transparent", "Black", "White", "Red", "Green", "Blue", "Yellow", "Orange", "Purple",
    "Gray", "Silver", "Maroon", "Navy", "Olive", "Teal", "Aqua", "Fuchsia", "Lime", "Brown",
    "Pink", "Gold", "Beige", "LightGray", "DarkGray", "LightBlue", "DarkBlue",
];

fn invalid(registry: &TypeRegistry, type_id: TypeId, property: &str, value: &str) -> ParseError {
    ParseError::new(
        ErrorCode::InvalidPropertyValue,
        format!(
            "Cannot create an object of type '{}' from its string representation '{}' for the '{}' property.",
            registry.full_name(type_id),
            value,
            property
        ),
    )
}

/// Convert `value` for a member of type `type_id` named `property`
pub fn convert_value(
    registry: &TypeRegistry,
    type_id: TypeId,
    property: &str,
    value: &str,
) -> Result<PropertyValue> {
    let desc = registry.get(type_id);
    let trimmed = value.trim();
    let converted = match desc.value_kind {
        ValueKind::String | ValueKind::Object => PropertyValue::String(value.to_string()),
        ValueKind::Boolean => {
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("true") {
                PropertyValue::Bool(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                PropertyValue::Bool(false)
            } else {
                return Err(invalid(registry, type_id, property, value));
            }
        }
        ValueKind::Int32 => PropertyValue::Int(
            trimmed.parse().map_err(|_| invalid(registry, type_id, property, value))?,
        ),
        ValueKind::UInt32 => PropertyValue::UInt(
            trimmed.parse().map_err(|_| invalid(registry, type_id, property, value))?,
        ),
        ValueKind::Double => PropertyValue::Double(
            trimmed.parse().map_err(|_| invalid(registry, type_id, property, value))?,
        ),
        ValueKind::Enum => convert_enum(registry, type_id, property, trimmed)?,
        ValueKind::Unit => match parse_unit(trimmed) {
            Some(v) => v,
            None => return Err(invalid(registry, type_id, property, value)),
        },
        ValueKind::FontUnit => {
            let name = trimmed.replace('-', "");
            match FONT_SIZES.iter().find(|s| s.eq_ignore_ascii_case(&name)) {
                Some(size) => PropertyValue::FontUnit(size.to_string()),
                None => match parse_unit(trimmed) {
                    Some(PropertyValue::Unit { value, unit }) => {
                        PropertyValue::FontUnit(format!("{}{}", value, unit))
                    }
                    Some(other) => other,
                    None => return Err(invalid(registry, type_id, property, value)),
                },
            }
        }
        ValueKind::Color => {
            if trimmed.is_empty() {
                PropertyValue::Null
            } else if HEX_COLOR.is_match(trimmed) {
                let hex = &trimmed[1..];
                let full: String = if hex.len() == 3 {
                    hex.chars().flat_map(|c| [c, c]).collect()
                } else {
                    hex.to_string()
                };
                PropertyValue::Color(format!("#{}", full.to_ascii_uppercase()))
            } else {
                match COLOR_NAMES.iter().find(|c| c.eq_ignore_ascii_case(trimmed)) {
                    Some(name) => PropertyValue::Color(name.to_string()),
                    None => return Err(invalid(registry, type_id, property, value)),
                }
            }
        }
        ValueKind::None => return Err(invalid(registry, type_id, property, value)),
    };
    Ok(converted)
}

fn parse_unit(value: &str) -> Option<PropertyValue> {
    if value.is_empty() {
        return Some(PropertyValue::Null);
    }
    let caps = UNIT.captures(value)?;
    let number: f64 = caps["value"].parse().ok()?;
    let unit = caps.name("unit").map_or("px".to_string(), |u| u.as_str().to_ascii_lowercase());
    Some(PropertyValue::Unit { value: number, unit })
}

fn convert_enum(registry: &TypeRegistry, type_id: TypeId, property: &str, value: &str) -> Result<PropertyValue> {
    let desc = registry.get(type_id);
    let lookup = |part: &str| {
        desc.enum_values
            .iter()
            .find(|v| v.eq_ignore_ascii_case(part.trim()))
            .cloned()
            .ok_or_else(|| {
                ParseError::new(
                    ErrorCode::InvalidEnumValue,
                    format!(
                        "'{}' is not a valid value for the '{}' property of type '{}'.",
                        part.trim(),
                        property,
                        desc.full_name
                    ),
                )
            })
    };
    if desc.has_flag(TypeFlags::FLAGS_ENUM) {
        let parts = value.split(',').map(lookup).collect::<Result<Vec<_>>>()?;
        Ok(PropertyValue::Enum(parts.join(", ")))
    } else {
        Ok(PropertyValue::Enum(lookup(value)?))
    }
}
