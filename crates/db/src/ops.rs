//! Session-level entity operations.
//!
//! These are the parts of the entity protocol that need storage: resolving
//! an incoming payload to an existing row, soft deletion, listing, and the
//! add/edit flows that persist a mutation and fire the matching hook.

use cshare_core::deserialize::ChangeSet;
use cshare_core::entity::Serializable;
use cshare_core::error::CoreError;
use cshare_core::filter::QueryArgs;
use cshare_core::roles::Requester;
use cshare_core::types::DbId;
use serde_json::{Map, Value};

use crate::error::DbResult;
use crate::session::Session;

/// Read the `id` of an incoming payload. `null` and absent are both `None`.
fn payload_id(data: &Map<String, Value>) -> Result<Option<DbId>, CoreError> {
    match data.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| CoreError::Validation(format!("Invalid id: {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CoreError::Validation(format!("Invalid id: {s}"))),
        Some(other) => Err(CoreError::Validation(format!("Invalid id: {other}"))),
    }
}

/// Resolve `data` to an entity.
///
/// With an `id`, the row is looked up (active or not) and updated in place
/// with the post-creation writable set; an id that resolves to nothing
/// yields `Ok(None)`. Without an `id`, a new entity is built via the add
/// path. Nothing is persisted; pass the result to [`Session::add`].
pub async fn admin_deserialize<E, S>(
    session: &mut S,
    data: &Map<String, Value>,
) -> DbResult<Option<E>>
where
    E: Serializable,
    S: Session,
{
    let spec = E::spec();
    match payload_id(data)? {
        Some(id) => {
            let Some(mut item) = session.find_by_id::<E>(id).await? else {
                tracing::warn!(entity = spec.entity, id, "admin_deserialize: id did not resolve");
                return Ok(None);
            };
            item.admin_deserialize_update(data, false)?;
            Ok(Some(item))
        }
        None => Ok(Some(E::admin_deserialize_add(data)?)),
    }
}

/// Soft-delete `entity`.
///
/// Returns `false` without touching storage when the entity is already
/// inactive; otherwise marks it inactive, persists it, runs `on_delete` and
/// returns `true`. A failed write leaves the entity active. Rights are the
/// caller's to check via [`Serializable::has_delete_rights`].
pub async fn delete<E, S>(
    session: &mut S,
    entity: &mut E,
    requester: Option<&dyn Requester>,
) -> DbResult<bool>
where
    E: Serializable,
    S: Session,
{
    if !entity.is_active() {
        return Ok(false);
    }
    entity.set_active(false);
    if let Err(err) = session.add(entity).await {
        entity.set_active(true);
        return Err(err);
    }
    entity.on_delete(requester);
    tracing::info!(entity = E::spec().entity, id = ?entity.id(), "Soft-deleted");
    Ok(true)
}

/// Create, persist and announce a new entity on behalf of `requester`.
pub async fn admin_add<E, S>(
    session: &mut S,
    data: &Map<String, Value>,
    requester: Option<&dyn Requester>,
) -> DbResult<E>
where
    E: Serializable,
    S: Session,
{
    let spec = E::spec();
    if !E::has_add_rights(data, requester) {
        return Err(CoreError::Forbidden(format!("Not permitted to add {}", spec.entity)).into());
    }
    let mut item = E::admin_deserialize_add(data)?;
    session.add(&mut item).await?;
    item.on_add(requester);
    Ok(item)
}

/// Apply `data` to `entity` on behalf of `requester`, persisting only when
/// something changed, then run `on_edit`.
pub async fn admin_edit<E, S>(
    session: &mut S,
    entity: &mut E,
    data: &Map<String, Value>,
    requester: Option<&dyn Requester>,
) -> DbResult<ChangeSet>
where
    E: Serializable,
    S: Session,
{
    let spec = E::spec();
    if !entity.has_admin_rights(requester) {
        return Err(CoreError::Forbidden(format!("Not permitted to edit {}", spec.entity)).into());
    }
    let changes = entity.admin_deserialize_update(data, false)?;
    if !changes.is_unchanged() {
        session.add(entity).await?;
    }
    entity.on_edit(requester, changes.is_unchanged());
    Ok(changes)
}

/// List active entities matching `args`.
///
/// `Forbidden` when the requester may not list this type.
pub async fn list<E, S>(
    session: &mut S,
    args: &QueryArgs,
    requester: Option<&dyn Requester>,
) -> DbResult<Vec<E>>
where
    E: Serializable,
    S: Session,
{
    if !E::has_read_many_rights(requester) {
        return Err(
            CoreError::Forbidden(format!("Not permitted to list {}", E::spec().entity)).into(),
        );
    }
    let query = E::args_to_query(args, requester)?;
    session.fetch_all(&query).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
