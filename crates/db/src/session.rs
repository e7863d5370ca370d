//! Unit-of-work abstraction over entity storage.

use async_trait::async_trait;
use cshare_core::entity::Serializable;
use cshare_core::error::CoreError;
use cshare_core::filter::EntityQuery;
use cshare_core::types::DbId;
use sqlx::{PgConnection, Row};

use crate::error::{DbError, DbResult};
use crate::sql;

/// Storage collaborator of the entity operations.
///
/// A session is bound to one unit of work; transaction boundaries belong to
/// whoever created it.
#[async_trait]
pub trait Session: Send {
    /// Look up an entity by id, active or not.
    async fn find_by_id<E: Serializable>(&mut self, id: DbId) -> DbResult<Option<E>>;

    /// Persist `entity`: insert when it has no id yet (assigning the
    /// generated one), update otherwise. A unique-constraint violation is
    /// reported as `CoreError::Conflict`.
    async fn add<E: Serializable>(&mut self, entity: &mut E) -> DbResult<()>;

    /// Every entity matching `query`.
    async fn fetch_all<E: Serializable>(&mut self, query: &EntityQuery<E>) -> DbResult<Vec<E>>;
}

/// PostgreSQL session over a borrowed connection or transaction.
///
/// ```ignore
/// let mut tx = pool.begin().await?;
/// let mut session = PgSession::new(&mut tx);
/// let user: Option<User> = session.find_by_id(42).await?;
/// tx.commit().await?;
/// ```
pub struct PgSession<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgSession<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<'c> Session for PgSession<'c> {
    async fn find_by_id<E: Serializable>(&mut self, id: DbId) -> DbResult<Option<E>> {
        let mut qb = sql::select_by_id::<E>(id);
        let row = qb.build().fetch_optional(&mut *self.conn).await?;
        row.as_ref().map(sql::decode_row::<E>).transpose()
    }

    async fn add<E: Serializable>(&mut self, entity: &mut E) -> DbResult<()> {
        let spec = E::spec();
        match entity.id() {
            None => {
                let mut qb = sql::insert(&*entity);
                let row = qb
                    .build()
                    .fetch_one(&mut *self.conn)
                    .await
                    .map_err(|e| DbError::from(e).conflict_on_unique(spec.entity))?;
                let id: DbId = row.try_get("id")?;
                sql::assign_id(entity, id)?;
                tracing::debug!(entity = spec.entity, id, "Inserted row");
            }
            Some(id) => {
                let mut qb = sql::update(&*entity, id);
                let result = qb
                    .build()
                    .execute(&mut *self.conn)
                    .await
                    .map_err(|e| DbError::from(e).conflict_on_unique(spec.entity))?;
                if result.rows_affected() == 0 {
                    return Err(CoreError::NotFound {
                        entity: spec.entity,
                        id,
                    }
                    .into());
                }
                tracing::debug!(entity = spec.entity, id, "Updated row");
            }
        }
        Ok(())
    }

    async fn fetch_all<E: Serializable>(&mut self, query: &EntityQuery<E>) -> DbResult<Vec<E>> {
        let mut qb = sql::select(query);
        let rows = qb.build().fetch_all(&mut *self.conn).await?;
        rows.iter().map(sql::decode_row::<E>).collect()
    }
}
