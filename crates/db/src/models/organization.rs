//! Organization entity: a group that members share resources through.

use chrono::Utc;
use cshare_core::entity::{EntitySpec, Permissions, Serializable};
use cshare_core::field::FieldDef;
use cshare_core::roles::Requester;
use cshare_core::types::{DbId, Timestamp};

/// A row from the `organizations` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Organization {
    pub id: Option<DbId>,
    pub active: bool,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub date_created: Timestamp,
    /// User that registered the organization; set once at creation.
    pub created_by: Option<DbId>,
    /// Times `on_delete` has fired on this instance. Not persisted.
    pub delete_events: u32,
}

impl Default for Organization {
    fn default() -> Self {
        Self {
            id: None,
            active: true,
            name: String::new(),
            description: None,
            website: None,
            date_created: Utc::now().naive_utc(),
            created_by: None,
            delete_events: 0,
        }
    }
}

static ORGANIZATION_FIELDS: &[FieldDef<Organization>] = &[
    cshare_core::field!(Organization, id: Integer),
    cshare_core::field!(Organization, active: Boolean),
    cshare_core::field!(Organization, name: Text),
    cshare_core::field!(Organization, description: Text),
    cshare_core::field!(Organization, website: Text),
    cshare_core::field!(Organization, date_created: DateTime),
    cshare_core::field!(Organization, created_by: Integer),
];

static ORGANIZATION_SPEC: EntitySpec<Organization> = EntitySpec {
    entity: "organization",
    table: "organizations",
    fields: ORGANIZATION_FIELDS,
    mandatory: &["name"],
    writable_once: &["created_by"],
    writable: &["name", "description", "website"],
    standard_readable: &["name", "description", "website"],
    admin_readable: &[
        "name",
        "description",
        "website",
        "date_created",
        "created_by",
        "active",
    ],
    permissions: Permissions {
        all_can_read_many: true,
        admin_can_delete: true,
        ..Permissions::DEFAULT
    },
    serializers: &[],
    deserializers: &[],
};

impl Serializable for Organization {
    fn spec() -> &'static EntitySpec<Self> {
        &ORGANIZATION_SPEC
    }

    fn id(&self) -> Option<DbId> {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    // Public profile.
    fn has_standard_rights(&self, _requester: Option<&dyn Requester>) -> bool {
        true
    }

    fn on_delete(&mut self, _requester: Option<&dyn Requester>) {
        self.delete_events += 1;
        tracing::info!(id = ?self.id, name = %self.name, "Organization deactivated");
    }
}

#[cfg(test)]
mod tests {
    use cshare_core::roles::{AuthRequester, ROLE_ADMIN, ROLE_MEMBER};
    use serde_json::{json, Value};

    use super::*;

    fn map(v: Value) -> serde_json::Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn spec_is_valid() {
        Organization::spec().validate().unwrap();
    }

    #[test]
    fn anonymous_reads_public_fields() {
        let org = Organization {
            id: Some(3),
            name: "Makers".into(),
            created_by: Some(1),
            ..Organization::default()
        };
        let out = org.serialize(None, &[]).into_fields().unwrap();
        let mut keys: Vec<_> = out.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["description", "id", "name", "website"]);
        assert!(Organization::has_read_many_rights(None));
    }

    #[test]
    fn creator_is_set_only_on_add() {
        let data = map(json!({"name": "Makers", "created_by": 5}));
        let mut org = Organization::admin_deserialize_add(&data).unwrap();
        assert_eq!(org.created_by, Some(5));

        let changes = org
            .admin_deserialize_update(&map(json!({"created_by": 6})), false)
            .unwrap();
        assert!(changes.is_unchanged());
        assert_eq!(org.created_by, Some(5));
    }

    #[test]
    fn only_admins_delete() {
        let org = Organization::default();
        assert!(org.has_delete_rights(Some(&AuthRequester::new(1, ROLE_ADMIN))));
        assert!(!org.has_delete_rights(None));
        assert!(Organization::spec().permissions.admin_can_delete);
        assert!(!org.has_delete_rights(Some(&AuthRequester::new(2, ROLE_MEMBER))));
    }
}
