//! Permission-tiered read path.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::entity::Serializable;
use crate::roles::Requester;

/// Outcome of serializing an entity for a requester.
///
/// `Fields` with an empty map means "permitted, nothing readable"; it is
/// never used to signal a denial. Serializes as `null` when denied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Serialized {
    Denied,
    Fields(Map<String, Value>),
}

impl Serialized {
    pub fn is_denied(&self) -> bool {
        matches!(self, Serialized::Denied)
    }

    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            Serialized::Denied => None,
            Serialized::Fields(map) => Some(map),
        }
    }

    pub fn into_fields(self) -> Option<Map<String, Value>> {
        match self {
            Serialized::Denied => None,
            Serialized::Fields(map) => Some(map),
        }
    }
}

/// Serialize the fields of `entity` readable at the requester's tier.
///
/// Admin rights select the admin tier, otherwise standard rights select the
/// standard tier, otherwise the read is denied. Names in `exclude` are
/// dropped, but `id` is always present when the type declares it.
pub fn serialize<E: Serializable>(
    entity: &E,
    requester: Option<&dyn Requester>,
    exclude: &[&str],
) -> Serialized {
    let spec = E::spec();
    let tier = if entity.has_admin_rights(requester) {
        spec.admin_readable
    } else if entity.has_standard_rights(requester) {
        spec.standard_readable
    } else {
        return Serialized::Denied;
    };

    let mut names: Vec<&str> = tier
        .iter()
        .copied()
        .filter(|name| !exclude.contains(name))
        .collect();
    if spec.field("id").is_some() && !names.contains(&"id") {
        names.push("id");
    }

    let mut out = Map::new();
    for name in names {
        let value = if let Some(custom) = spec.serializer(name) {
            (custom.func)(entity, requester)
        } else if let Some(field) = spec.field(name) {
            (field.get)(entity).to_json()
        } else {
            tracing::warn!(entity = spec.entity, field = name, "Readable field has no accessor");
            continue;
        };
        out.insert(name.to_string(), value);
    }
    Serialized::Fields(out)
}

/// Serialize a listing. `None` when the requester may not list this type;
/// otherwise the entities the requester may read, in order.
pub fn serialize_many<'a, E, I>(
    entities: I,
    requester: Option<&dyn Requester>,
    exclude: &[&str],
) -> Option<Vec<Map<String, Value>>>
where
    E: Serializable,
    I: IntoIterator<Item = &'a E>,
{
    if !E::has_read_many_rights(requester) {
        return None;
    }
    Some(
        entities
            .into_iter()
            .filter_map(|e| e.serialize(requester, exclude).into_fields())
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
