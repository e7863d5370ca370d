//! Partial-update write path.

use serde_json::{Map, Value};

use crate::entity::Serializable;
use crate::error::CoreError;
use crate::field::FieldValue;

/// Names of the fields an update actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changed: Vec<&'static str>,
}

impl ChangeSet {
    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.changed.contains(&name)
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.changed
    }

    fn record(&mut self, name: &'static str) {
        if !self.changed.contains(&name) {
            self.changed.push(name);
        }
    }
}

/// Create a new entity from `data`.
///
/// Fails with [`CoreError::Validation`] naming the first mandatory field
/// missing from `data`.
pub fn admin_deserialize_add<E: Serializable>(data: &Map<String, Value>) -> Result<E, CoreError> {
    let spec = E::spec();
    if let Some(missing) = spec.mandatory.iter().find(|name| !data.contains_key(**name)) {
        return Err(CoreError::Validation(format!(
            "Missing necessary field: {missing}"
        )));
    }
    let mut item = E::default();
    admin_deserialize_update(&mut item, data, true)?;
    Ok(item)
}

/// Apply `data` to `entity` in place.
///
/// Custom deserializers always run. Other keys are applied only when they
/// are writable in the current mode and name a column; the incoming value is
/// coerced to the column kind first and assigned only if it differs from the
/// current value. Keys that are neither are ignored.
pub fn admin_deserialize_update<E: Serializable>(
    entity: &mut E,
    data: &Map<String, Value>,
    add: bool,
) -> Result<ChangeSet, CoreError> {
    let spec = E::spec();
    tracing::debug!(entity = spec.entity, add, "admin_deserialize_update");

    let mut changes = ChangeSet::default();
    for (key, raw) in data {
        if let Some(custom) = spec.deserializer(key) {
            if (custom.func)(entity, raw)? {
                changes.record(custom.name);
            }
            continue;
        }

        if !spec.is_writable(key, add) {
            continue;
        }
        let Some(field) = spec.field(key) else {
            continue;
        };

        let current = (field.get)(entity);
        let new_value = FieldValue::coerce(field.name, field.kind, raw)?;
        if current != new_value {
            tracing::debug!(
                field = field.name,
                from = ?current,
                to = ?new_value,
                "Changing attribute"
            );
            (field.set)(entity, new_value)?;
            changes.record(field.name);
        }
    }
    Ok(changes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
