//! Collection Builder
//!
//! A nested element describing a collection property (`<Columns>`). Child
//! elements are resolved through the tag registry and must be assignable to
//! the collection's item type, inferred from its `Item` indexer.

use super::BuildContext;
use crate::error::{ErrorCode, ParseError, Result};
use crate::schema::{TypeFlags, TypeId, TypeRegistry};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionData {
    #[serde(skip)]
    pub item_type: Option<TypeId>,
    pub item_type_name: Option<String>,
    pub ignore_unknown_content: bool,
}

/// Item type of a collection type.
///
/// The nearest type declaring an `Item` indexer decides. Overloaded indexers
/// fall back to `System.Object`.
pub fn infer_item_type(registry: &TypeRegistry, collection_type: TypeId) -> Option<TypeId> {
    let declaring = registry.ancestors(collection_type).find(|t| !t.item_types.is_empty())?;
    if declaring.item_types.len() == 1 {
        return Some(declaring.item_types[0]);
    }
    log::warn!(
        "'{}' declares {} Item indexers; accepting any item type",
        declaring.full_name,
        declaring.item_types.len()
    );
    registry.find("System.Object")
}

impl CollectionData {
    pub fn new(registry: &TypeRegistry, collection_type: TypeId, owner_type: Option<TypeId>) -> Self {
        let item_type = infer_item_type(registry, collection_type);
        let ignore_unknown_content = registry.inherits_flag(collection_type, TypeFlags::IGNORE_UNKNOWN_CONTENT)
            || owner_type.map_or(false, |o| registry.inherits_flag(o, TypeFlags::IGNORE_UNKNOWN_CONTENT));
        CollectionData {
            item_type,
            item_type_name: item_type.map(|t| registry.full_name(t).to_string()),
            ignore_unknown_content,
        }
    }

    /// Resolve the type of a child element.
    ///
    /// Returns `Ok(None)` when the child isn't a valid item and unknown
    /// content is ignored; the child is then dropped.
    pub fn child_type(
        &self,
        ctx: &BuildContext,
        collection_type: Option<TypeId>,
        tag_name: &str,
        input_type: Option<&str>,
    ) -> Result<Option<TypeId>> {
        let child = match ctx.resolve_tag(tag_name, input_type) {
            Ok(resolved) => resolved.type_id,
            Err(_) if self.ignore_unknown_content => return Ok(None),
            Err(e) => return Err(e),
        };
        self.check_item(ctx.registry, collection_type, tag_name, child)
    }

    pub(crate) fn check_item(
        &self,
        registry: &TypeRegistry,
        collection_type: Option<TypeId>,
        tag_name: &str,
        child: TypeId,
    ) -> Result<Option<TypeId>> {
        let Some(item_type) = self.item_type else {
            return Ok(Some(child));
        };
        if registry.is_assignable(child, item_type) {
            return Ok(Some(child));
        }
        if self.ignore_unknown_content {
            return Ok(None);
        }
        Err(ParseError::new(
            ErrorCode::InvalidCollectionItemType,
            format!(
                "The collection of type '{}' expects items of type '{}', but the tag '{}' is of type '{}'.",
                collection_type.map_or("?", |t| registry.full_name(t)),
                registry.full_name(item_type),
                tag_name,
                registry.full_name(child)
            ),
        ))
    }
}
