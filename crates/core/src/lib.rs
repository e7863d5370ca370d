//! Storage-agnostic core of the community-share entity layer.
//!
//! Entity types describe themselves with a static [`entity::EntitySpec`]
//! (field accessor table, field-name sets, permission descriptor and custom
//! (de)serializer tables) and implement [`entity::Serializable`] to get
//! permission-gated serialization, the partial-update deserialization
//! protocol and query-filter building.

pub mod deserialize;
pub mod entity;
pub mod error;
pub mod field;
pub mod filter;
pub mod permissions;
pub mod roles;
pub mod serialize;
pub mod time;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
