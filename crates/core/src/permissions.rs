//! Requester-tier predicates backing the [`Serializable`] rights defaults.
//!
//! All predicates are total: an absent requester denies everything except
//! listing a type whose descriptor sets `all_can_read_many`.
//!
//! [`Serializable`]: crate::entity::Serializable

use crate::entity::Permissions;
use crate::roles::Requester;

/// Any present requester is authenticated.
pub fn is_authenticated(requester: Option<&dyn Requester>) -> bool {
    requester.is_some()
}

pub fn is_administrator(requester: Option<&dyn Requester>) -> bool {
    requester.is_some_and(|r| r.is_administrator())
}

/// Listing rights derived from the type's permission descriptor.
pub fn can_read_many(permissions: &Permissions, requester: Option<&dyn Requester>) -> bool {
    permissions.all_can_read_many
        || (permissions.standard_can_read_many && is_authenticated(requester))
        || is_administrator(requester)
}
