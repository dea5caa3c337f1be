//! Property Mapper
//!
//! Resolves attribute names such as `HeaderStyle-Font-Bold` to the member
//! chain `HeaderStyle.Font.Bold` on a registered type.

use super::type_registry::{MemberDescriptor, MemberKind, TypeFlags, TypeId, TypeRegistry};
use crate::error::{ErrorCode, ParseError, Result};

/// A resolved attribute name
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    /// Final member of the chain
    pub member: MemberDescriptor,
    /// Every member walked, outermost first
    pub chain: Vec<MemberDescriptor>,
    /// Canonical dotted name (`HeaderStyle.Font.Bold`)
    pub canonical_name: String,
}

impl MemberInfo {
    pub fn member_type(&self) -> TypeId {
        self.member.member_type
    }

    pub fn is_simple(&self) -> bool {
        self.chain.len() == 1
    }
}

/// Resolve a `-` separated attribute name against `type_id`.
///
/// Returns `Ok(None)` when some segment names no member. Every resolved
/// member type must be CLS compliant.
pub fn get_member_info(registry: &TypeRegistry, type_id: TypeId, name: &str) -> Result<Option<MemberInfo>> {
    let mut current = type_id;
    let mut chain: Vec<MemberDescriptor> = Vec::new();
    for part in name.split('-') {
        let member = match find_member(registry, current, part)? {
            Some(m) => m.clone(),
            None => return Ok(None),
        };
        let member_type = registry.get(member.member_type);
        if member_type.has_flag(TypeFlags::NOT_CLS_COMPLIANT) {
            return Err(ParseError::new(
                ErrorCode::PropertyNotClsCompliant,
                format!(
                    "The property '{}' of type '{}' is not CLS compliant: type '{}' cannot be used from markup.",
                    member.name,
                    registry.full_name(current),
                    member_type.full_name
                ),
            ));
        }
        current = member.member_type;
        chain.push(member);
    }
    let canonical_name = chain.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join(".");
    match chain.last() {
        Some(last) => Ok(Some(MemberInfo {
            member: last.clone(),
            canonical_name,
            chain,
        })),
        None => Ok(None),
    }
}

/// Find a single member by name. Properties win over fields.
///
/// When the name is declared at several levels of the hierarchy the nearest
/// declaration wins. Several matches at one level (names differing only in
/// case) prefer the exact-case spelling; otherwise the match is ambiguous.
pub fn find_member<'r>(
    registry: &'r TypeRegistry,
    type_id: TypeId,
    name: &str,
) -> Result<Option<&'r MemberDescriptor>> {
    for kind in [MemberKind::Property, MemberKind::Field] {
        let levels = registry.members_by_level(type_id, name, kind);
        let Some(nearest) = levels.first() else {
            continue;
        };
        if levels.len() > 1 {
            log::warn!(
                "'{}' is declared {} times in the hierarchy of '{}'; using the declaration on '{}'",
                name,
                levels.len(),
                registry.full_name(type_id),
                registry.full_name(nearest[0].declaring_type)
            );
        }
        if nearest.len() == 1 {
            return Ok(Some(nearest[0]));
        }
        let exact: Vec<_> = nearest.iter().filter(|m| m.name == name).collect();
        if exact.len() == 1 {
            return Ok(Some(exact[0]));
        }
        return Err(ParseError::new(
            ErrorCode::AmbiguousMatch,
            format!(
                "Ambiguous match found for '{}' on type '{}'.",
                name,
                registry.full_name(type_id)
            ),
        ));
    }
    Ok(None)
}
