//! SQL rendering over an entity's accessor table.
//!
//! Column and table names come from the static [`EntitySpec`] only; every
//! value is bound as a parameter.

use cshare_core::entity::{EntitySpec, Serializable};
use cshare_core::error::CoreError;
use cshare_core::field::{ColumnKind, FieldValue};
use cshare_core::filter::{EntityQuery, FilterValue, Predicate};
use cshare_core::types::{DbId, Timestamp};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};

use crate::error::DbResult;

/// Comma-separated column list in accessor-table order.
pub fn column_list<E: 'static>(spec: &EntitySpec<E>) -> String {
    spec.fields
        .iter()
        .map(|f| f.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Bind a typed value. `NULL` is written literally so it adopts the column
/// type.
pub fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Null => {
            qb.push("NULL");
        }
        FieldValue::Bool(v) => {
            qb.push_bind(*v);
        }
        FieldValue::Int(v) => {
            qb.push_bind(*v);
        }
        FieldValue::Float(v) => {
            qb.push_bind(*v);
        }
        FieldValue::Text(v) => {
            qb.push_bind(v.clone());
        }
        FieldValue::DateTime(v) => {
            qb.push_bind(*v);
        }
        FieldValue::Json(v) => {
            qb.push_bind(Json(v.clone()));
        }
    }
}

/// Bind raw filter text, cast to the column type unless the column is text.
fn push_text_as(qb: &mut QueryBuilder<'static, Postgres>, kind: ColumnKind, text: &str) {
    if kind == ColumnKind::Text {
        qb.push_bind(text.to_string());
    } else {
        qb.push("CAST(");
        qb.push_bind(text.to_string());
        qb.push(format_args!(" AS {})", kind.sql_type()));
    }
}

pub fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Compare {
            column,
            kind,
            op,
            value,
        } => {
            qb.push(format_args!("{column} {} ", op.sql()));
            match value {
                FilterValue::Bool(b) => {
                    qb.push_bind(*b);
                }
                FilterValue::Text(s) => push_text_as(qb, *kind, s),
            }
        }
        Predicate::Pattern {
            column,
            op,
            pattern,
        } => {
            qb.push(format_args!("{column} {} ", op.sql()));
            qb.push_bind(pattern.clone());
        }
        Predicate::In {
            column,
            kind,
            values,
        } => {
            qb.push(format_args!("{column} IN ("));
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_text_as(qb, *kind, v);
            }
            qb.push(")");
        }
    }
}

/// `SELECT <columns> FROM <table> WHERE <p1> AND <p2> ...`.
pub fn select<E: Serializable>(query: &EntityQuery<E>) -> QueryBuilder<'static, Postgres> {
    let spec = E::spec();
    let mut qb = QueryBuilder::new(format!(
        "SELECT {} FROM {}",
        column_list(spec),
        spec.table
    ));
    for (i, predicate) in query.filters().iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        push_predicate(&mut qb, predicate);
    }
    qb
}

/// `SELECT <columns> FROM <table> WHERE id = $1`, active or not.
pub fn select_by_id<E: Serializable>(id: DbId) -> QueryBuilder<'static, Postgres> {
    let spec = E::spec();
    let mut qb = QueryBuilder::new(format!(
        "SELECT {} FROM {} WHERE id = ",
        column_list(spec),
        spec.table
    ));
    qb.push_bind(id);
    qb
}

/// `INSERT` every column except `id`, returning the generated id.
pub fn insert<E: Serializable>(entity: &E) -> QueryBuilder<'static, Postgres> {
    let spec = E::spec();
    let columns: Vec<_> = spec.fields.iter().filter(|f| f.name != "id").collect();

    let names = columns.iter().map(|f| f.name).collect::<Vec<_>>().join(", ");
    let mut qb = QueryBuilder::new(format!("INSERT INTO {} ({names}) VALUES (", spec.table));
    for (i, field) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(&mut qb, &(field.get)(entity));
    }
    qb.push(") RETURNING id");
    qb
}

/// `UPDATE` every column except `id` on the row with the given id.
pub fn update<E: Serializable>(entity: &E, id: DbId) -> QueryBuilder<'static, Postgres> {
    let spec = E::spec();
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", spec.table));
    for (i, field) in spec.fields.iter().filter(|f| f.name != "id").enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format_args!("{} = ", field.name));
        push_value(&mut qb, &(field.get)(entity));
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb
}

/// Decode a row column-by-column through the accessor table.
pub fn decode_row<E: Serializable>(row: &PgRow) -> DbResult<E> {
    let mut entity = E::default();
    for field in E::spec().fields {
        let value: FieldValue = match field.kind {
            ColumnKind::Boolean => row.try_get::<Option<bool>, _>(field.name)?.into(),
            ColumnKind::Integer => row.try_get::<Option<i64>, _>(field.name)?.into(),
            ColumnKind::Float => row.try_get::<Option<f64>, _>(field.name)?.into(),
            ColumnKind::Text => row.try_get::<Option<String>, _>(field.name)?.into(),
            ColumnKind::DateTime => row.try_get::<Option<Timestamp>, _>(field.name)?.into(),
            ColumnKind::Json => row
                .try_get::<Option<Json<serde_json::Value>>, _>(field.name)?
                .map(|j| j.0)
                .into(),
        };
        (field.set)(&mut entity, value)?;
    }
    Ok(entity)
}

/// Apply a generated id through the `id` accessor.
pub fn assign_id<E: Serializable>(entity: &mut E, id: DbId) -> DbResult<()> {
    let spec = E::spec();
    let field = spec.field("id").ok_or_else(|| {
        CoreError::Internal(format!("{} has no `id` column", spec.entity))
    })?;
    (field.set)(entity, FieldValue::Int(id))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use cshare_core::filter::QueryArgs;

    use super::*;
    use crate::models::user::User;

    fn args(pairs: &[(&str, &str)]) -> QueryArgs {
        pairs.iter().copied().collect()
    }

    #[test]
    fn select_always_filters_active() {
        let query = User::args_to_query(&QueryArgs::new(), None).unwrap();
        let qb = select(&query);
        assert!(qb.sql().starts_with("SELECT id, active, name, email"));
        assert!(qb.sql().ends_with("FROM users WHERE active = $1"));
    }

    #[test]
    fn comparison_casts_text_to_column_type() {
        let query =
            User::args_to_query(&args(&[("date_created.greaterthan", "2024-01-01")]), None)
                .unwrap();
        let qb = select(&query);
        assert!(qb
            .sql()
            .contains("WHERE active = $1 AND date_created > CAST($2 AS TIMESTAMP)"));
    }

    #[test]
    fn boolean_equality_binds_bool() {
        let query = User::args_to_query(&args(&[("is_administrator", "true")]), None).unwrap();
        let qb = select(&query);
        assert!(qb.sql().ends_with("AND is_administrator = $2"));
    }

    #[test]
    fn membership_lists_each_value() {
        let query =
            User::args_to_query(&args(&[("name.in", "a"), ("name.in", "b")]), None).unwrap();
        let qb = select(&query);
        assert!(qb.sql().contains("AND name IN ($2, $3)"));
    }

    #[test]
    fn pattern_match_uses_operator() {
        let query = User::args_to_query(&args(&[("email.ilike", "%@EXAMPLE.org")]), None).unwrap();
        let qb = select(&query);
        assert!(qb.sql().contains("AND email ILIKE $2"));
    }

    #[test]
    fn insert_skips_id_and_inlines_null() {
        let user = User {
            name: "Ada".into(),
            email: "ada@example.org".into(),
            ..User::default()
        };
        let qb = insert(&user);
        let sql = qb.sql();
        assert!(sql.starts_with("INSERT INTO users (active, name, email, is_administrator"));
        assert!(sql.contains("NULL"), "bio is null: {sql}");
        assert!(sql.ends_with(") RETURNING id"));
    }

    #[test]
    fn update_targets_id() {
        let user = User {
            id: Some(4),
            name: "Ada".into(),
            ..User::default()
        };
        let qb = update(&user, 4);
        let sql = qb.sql();
        assert!(sql.starts_with("UPDATE users SET active = $1, name = $2"));
        assert!(!sql.contains("SET id"));
        assert!(sql.contains(" WHERE id = $"));
    }
}
