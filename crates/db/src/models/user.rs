//! User entity: a registered member of the community.

use chrono::Utc;
use cshare_core::entity::{CustomDeserializer, EntitySpec, Permissions, Serializable};
use cshare_core::error::CoreError;
use cshare_core::field::FieldDef;
use cshare_core::roles::Requester;
use cshare_core::types::{DbId, Timestamp};
use serde_json::Value;

/// A row from the `users` table.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<DbId>,
    pub active: bool,
    pub name: String,
    pub email: String,
    pub is_administrator: bool,
    pub bio: Option<String>,
    pub date_created: Timestamp,
    pub last_active: Option<Timestamp>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: None,
            active: true,
            name: String::new(),
            email: String::new(),
            is_administrator: false,
            bio: None,
            date_created: Utc::now().naive_utc(),
            last_active: None,
        }
    }
}

/// Normalize an incoming address to trimmed lowercase.
fn deserialize_email(user: &mut User, raw: &Value) -> Result<bool, CoreError> {
    let email = raw
        .as_str()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| s.contains('@'))
        .ok_or_else(|| CoreError::Validation(format!("Invalid email address: {raw}")))?;
    if user.email == email {
        return Ok(false);
    }
    user.email = email;
    Ok(true)
}

static USER_FIELDS: &[FieldDef<User>] = &[
    cshare_core::field!(User, id: Integer),
    cshare_core::field!(User, active: Boolean),
    cshare_core::field!(User, name: Text),
    cshare_core::field!(User, email: Text),
    cshare_core::field!(User, is_administrator: Boolean),
    cshare_core::field!(User, bio: Text),
    cshare_core::field!(User, date_created: DateTime),
    cshare_core::field!(User, last_active: DateTime),
];

static USER_SPEC: EntitySpec<User> = EntitySpec {
    entity: "user",
    table: "users",
    fields: USER_FIELDS,
    mandatory: &["name", "email"],
    writable_once: &[],
    writable: &["name", "email", "bio", "last_active"],
    standard_readable: &["name", "bio", "last_active"],
    admin_readable: &[
        "name",
        "email",
        "is_administrator",
        "bio",
        "date_created",
        "last_active",
        "active",
    ],
    permissions: Permissions {
        standard_can_read_many: true,
        ..Permissions::DEFAULT
    },
    serializers: &[],
    deserializers: &[CustomDeserializer {
        name: "email",
        func: deserialize_email,
    }],
};

impl Serializable for User {
    fn spec() -> &'static EntitySpec<Self> {
        &USER_SPEC
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

    /// Administrators, and the user themselves.
    fn has_admin_rights(&self, requester: Option<&dyn Requester>) -> bool {
        match requester {
            Some(r) if r.is_administrator() => true,
            Some(r) => self.id.is_some() && r.user_id() == self.id,
            None => false,
        }
    }
}

impl Requester for User {
    fn is_administrator(&self) -> bool {
        self.is_administrator
    }

    fn user_id(&self) -> Option<DbId> {
        self.id
    }
}
