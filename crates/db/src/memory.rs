//! In-memory [`Session`] for tests and tooling that run without PostgreSQL.
//!
//! Rows are stored as accessor-table snapshots, so any
//! [`Serializable`] type works without extra impls. Queries are evaluated
//! with [`EntityQuery::matches`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use cshare_core::entity::Serializable;
use cshare_core::error::CoreError;
use cshare_core::field::FieldValue;
use cshare_core::filter::EntityQuery;
use cshare_core::types::DbId;

use crate::error::DbResult;
use crate::session::Session;
use crate::sql;

type Row = Vec<FieldValue>;

#[derive(Debug, Default)]
pub struct MemorySession {
    tables: HashMap<&'static str, BTreeMap<DbId, Row>>,
    next_id: DbId,
    writes: usize,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of inserts and updates performed so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn snapshot<E: Serializable>(entity: &E) -> Row {
        E::spec().fields.iter().map(|f| (f.get)(entity)).collect()
    }

    fn restore<E: Serializable>(row: &Row) -> DbResult<E> {
        let mut entity = E::default();
        for (field, value) in E::spec().fields.iter().zip(row) {
            (field.set)(&mut entity, value.clone())?;
        }
        Ok(entity)
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn find_by_id<E: Serializable>(&mut self, id: DbId) -> DbResult<Option<E>> {
        self.tables
            .get(E::spec().table)
            .and_then(|rows| rows.get(&id))
            .map(Self::restore::<E>)
            .transpose()
    }

    async fn add<E: Serializable>(&mut self, entity: &mut E) -> DbResult<()> {
        let spec = E::spec();
        let id = match entity.id() {
            Some(id) => {
                let exists = self
                    .tables
                    .get(spec.table)
                    .is_some_and(|rows| rows.contains_key(&id));
                if !exists {
                    return Err(CoreError::NotFound {
                        entity: spec.entity,
                        id,
                    }
                    .into());
                }
                id
            }
            None => {
                self.next_id += 1;
                sql::assign_id(entity, self.next_id)?;
                self.next_id
            }
        };
        let row = Self::snapshot(&*entity);
        self.tables.entry(spec.table).or_default().insert(id, row);
        self.writes += 1;
        Ok(())
    }

    async fn fetch_all<E: Serializable>(&mut self, query: &EntityQuery<E>) -> DbResult<Vec<E>> {
        let Some(rows) = self.tables.get(E::spec().table) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for row in rows.values() {
            let entity = Self::restore::<E>(row)?;
            if query.matches(&entity) {
                out.push(entity);
            }
        }
        Ok(out)
    }
}
