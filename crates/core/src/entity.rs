//! Per-type entity specification and the [`Serializable`] trait.
//!
//! An entity type owns one `static` [`EntitySpec`] describing its columns,
//! which of them are mandatory / writable / readable, its permission
//! descriptor, and any custom (de)serializers. Everything in
//! [`Serializable`] beyond the small required surface is driven by that
//! spec.

use serde_json::{Map, Value};

use crate::deserialize::{self, ChangeSet};
use crate::error::CoreError;
use crate::field::{ColumnKind, FieldDef};
use crate::filter::{self, EntityQuery, Predicate, QueryArgs};
use crate::permissions;
use crate::roles::Requester;
use crate::serialize::{self, Serialized};
use crate::types::DbId;

/// Custom read function: receives the entity and the requester.
pub type SerializeFn<E> = fn(&E, Option<&dyn Requester>) -> Value;

/// Custom write function: receives the entity and the raw incoming value.
/// Returns whether the entity changed.
pub type DeserializeFn<E> = fn(&mut E, &Value) -> Result<bool, CoreError>;

pub struct CustomSerializer<E: 'static> {
    pub name: &'static str,
    pub func: SerializeFn<E>,
}

pub struct CustomDeserializer<E: 'static> {
    pub name: &'static str,
    pub func: DeserializeFn<E>,
}

/// Static permission descriptor of an entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    /// Anyone, including anonymous requesters, may list this type.
    pub all_can_read_many: bool,
    /// Any authenticated requester may list this type.
    pub standard_can_read_many: bool,
    /// Declarative only: the default `has_delete_rights` already admits
    /// every administrator, so this flag changes no decision.
    pub admin_can_delete: bool,
}

impl Permissions {
    pub const DEFAULT: Permissions = Permissions {
        all_can_read_many: false,
        standard_can_read_many: false,
        admin_can_delete: false,
    };
}

/// Declared capability record of an entity type.
pub struct EntitySpec<E: 'static> {
    /// Human-readable type name used in errors and logs.
    pub entity: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldDef<E>],
    pub mandatory: &'static [&'static str],
    pub writable_once: &'static [&'static str],
    pub writable: &'static [&'static str],
    pub standard_readable: &'static [&'static str],
    pub admin_readable: &'static [&'static str],
    pub permissions: Permissions,
    pub serializers: &'static [CustomSerializer<E>],
    pub deserializers: &'static [CustomDeserializer<E>],
}

impl<E: 'static> EntitySpec<E> {
    pub fn field(&self, name: &str) -> Option<&FieldDef<E>> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn serializer(&self, name: &str) -> Option<&CustomSerializer<E>> {
        self.serializers.iter().find(|s| s.name == name)
    }

    pub fn deserializer(&self, name: &str) -> Option<&CustomDeserializer<E>> {
        self.deserializers.iter().find(|d| d.name == name)
    }

    /// Whether `name` may be written during creation (`add`) or afterwards.
    pub fn is_writable(&self, name: &str, add: bool) -> bool {
        self.writable.contains(&name)
            || (add && (self.mandatory.contains(&name) || self.writable_once.contains(&name)))
    }

    /// Check the spec for internal consistency.
    ///
    /// - `id` must be an `Integer` column and `active` a `Boolean` column.
    /// - Column names must be unique.
    /// - Every readable name needs a column or a custom serializer.
    /// - Every mandatory / writable name needs a column or a custom deserializer.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |msg: String| Err(CoreError::Internal(format!("{}: {msg}", self.entity)));

        match self.field("id") {
            Some(f) if f.kind == ColumnKind::Integer => {}
            _ => return invalid("missing Integer column `id`".into()),
        }
        match self.field("active") {
            Some(f) if f.kind == ColumnKind::Boolean => {}
            _ => return invalid("missing Boolean column `active`".into()),
        }

        for (i, f) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|other| other.name == f.name) {
                return invalid(format!("duplicate column `{}`", f.name));
            }
        }

        for name in self.standard_readable.iter().chain(self.admin_readable) {
            if self.field(name).is_none() && self.serializer(name).is_none() {
                return invalid(format!("readable field `{name}` has no accessor"));
            }
        }

        for name in self
            .mandatory
            .iter()
            .chain(self.writable_once)
            .chain(self.writable)
        {
            if self.field(name).is_none() && self.deserializer(name).is_none() {
                return invalid(format!("writable field `{name}` has no accessor"));
            }
        }

        Ok(())
    }
}

/// A persisted domain object with permission-gated (de)serialization.
///
/// Implementors supply [`spec`](Serializable::spec) plus the `id` / `active`
/// accessors; the rights checks and hooks may be overridden per type.
pub trait Serializable: Default + Send + Sync + Sized + 'static {
    fn spec() -> &'static EntitySpec<Self>;

    fn id(&self) -> Option<DbId>;

    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    // -- rights -------------------------------------------------------------

    fn has_add_rights(_data: &Map<String, Value>, requester: Option<&dyn Requester>) -> bool {
        permissions::is_administrator(requester)
    }

    fn has_read_many_rights(requester: Option<&dyn Requester>) -> bool {
        permissions::can_read_many(&Self::spec().permissions, requester)
    }

    fn has_standard_rights(&self, requester: Option<&dyn Requester>) -> bool {
        permissions::is_authenticated(requester)
    }

    fn has_admin_rights(&self, requester: Option<&dyn Requester>) -> bool {
        permissions::is_administrator(requester)
    }

    fn has_delete_rights(&self, requester: Option<&dyn Requester>) -> bool {
        permissions::is_administrator(requester)
    }

    // -- hooks --------------------------------------------------------------

    fn on_add(&mut self, _requester: Option<&dyn Requester>) {}

    fn on_edit(&mut self, _requester: Option<&dyn Requester>, _unchanged: bool) {}

    fn on_delete(&mut self, _requester: Option<&dyn Requester>) {}

    // -- read / write -------------------------------------------------------

    /// Readable fields for `requester`, or [`Serialized::Denied`].
    fn serialize(&self, requester: Option<&dyn Requester>, exclude: &[&str]) -> Serialized {
        serialize::serialize(self, requester, exclude)
    }

    /// Build a new entity from `data`, requiring every mandatory field.
    fn admin_deserialize_add(data: &Map<String, Value>) -> Result<Self, CoreError> {
        deserialize::admin_deserialize_add(data)
    }

    /// Apply `data` in place; `add` widens the writable set to creation fields.
    fn admin_deserialize_update(
        &mut self,
        data: &Map<String, Value>,
        add: bool,
    ) -> Result<ChangeSet, CoreError> {
        deserialize::admin_deserialize_update(self, data, add)
    }

    // -- querying -----------------------------------------------------------

    fn args_to_filter_params(args: &QueryArgs) -> Result<Vec<Predicate>, CoreError> {
        filter::args_to_filter_params::<Self>(args)
    }

    /// Build the query for a listing request. Types may narrow it by
    /// requester; the default ignores the requester.
    fn args_to_query(
        args: &QueryArgs,
        _requester: Option<&dyn Requester>,
    ) -> Result<EntityQuery<Self>, CoreError> {
        Ok(EntityQuery::new(Self::args_to_filter_params(args)?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::test_support::{Widget, WIDGET_FIELDS};

    #[test]
    fn widget_spec_is_valid() {
        Widget::spec().validate().unwrap();
    }

    #[test]
    fn writable_set_depends_on_add_mode() {
        let spec = Widget::spec();
        assert!(spec.is_writable("label", false));
        assert!(!spec.is_writable("serial", false));
        assert!(spec.is_writable("serial", true));
        assert!(spec.is_writable("name", true));
        assert!(!spec.is_writable("secret", true));
    }

    #[test]
    fn validate_rejects_readable_name_without_accessor() {
        let spec = EntitySpec::<Widget> {
            entity: "broken",
            table: "broken",
            fields: WIDGET_FIELDS,
            mandatory: &[],
            writable_once: &[],
            writable: &[],
            standard_readable: &["nope"],
            admin_readable: &[],
            permissions: Permissions::DEFAULT,
            serializers: &[],
            deserializers: &[],
        };
        assert_matches!(spec.validate(), Err(CoreError::Internal(msg)) if msg.contains("nope"));
    }

    #[test]
    fn validate_requires_id_column() {
        let spec = EntitySpec::<Widget> {
            entity: "no-id",
            table: "no_id",
            fields: &WIDGET_FIELDS[1..],
            mandatory: &[],
            writable_once: &[],
            writable: &[],
            standard_readable: &[],
            admin_readable: &[],
            permissions: Permissions::DEFAULT,
            serializers: &[],
            deserializers: &[],
        };
        assert_matches!(spec.validate(), Err(CoreError::Internal(msg)) if msg.contains("`id`"));
    }
}
