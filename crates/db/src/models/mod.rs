//! Concrete entity models persisted by this crate.
//!
//! Each model declares a `static` [`EntitySpec`](cshare_core::entity::EntitySpec)
//! and implements [`Serializable`](cshare_core::entity::Serializable) over it.

pub mod organization;
pub mod user;

pub use organization::Organization;
pub use user::User;
