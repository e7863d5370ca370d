//! Requester abstraction and well-known role name constants.

use crate::types::DbId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MEMBER: &str = "member";

/// The actor attempting an operation.
///
/// Anonymous access is modelled as `Option::<&dyn Requester>::None` at every
/// call site, never as a requester value.
pub trait Requester: Send + Sync {
    fn is_administrator(&self) -> bool;

    /// Id of the user behind this requester, when known.
    fn user_id(&self) -> Option<DbId> {
        None
    }
}

/// Lightweight requester built from an authenticated identity and its role
/// name, for callers that do not have the full user row at hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequester {
    pub user_id: DbId,
    /// Role name (e.g. `"admin"`, `"member"`).
    pub role: String,
}

impl AuthRequester {
    pub fn new(user_id: DbId, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }
}

impl Requester for AuthRequester {
    fn is_administrator(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    fn user_id(&self) -> Option<DbId> {
        Some(self.user_id)
    }
}
