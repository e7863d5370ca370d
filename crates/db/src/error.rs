use cshare_core::error::CoreError;

/// Error type for session-level operations.
///
/// Wraps [`CoreError`] for domain errors (validation, unknown filters,
/// permission failures) and [`sqlx::Error`] for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience alias for session-level results.
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Whether this is a unique-constraint violation on a `uq_` constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Database(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("23505")
                    && db_err.constraint().is_some_and(|c| c.starts_with("uq_"))
            }
            _ => false,
        }
    }

    /// Turn a `uq_` constraint violation into [`CoreError::Conflict`]
    /// naming the entity and constraint. Other errors pass through.
    pub fn conflict_on_unique(self, entity: &str) -> DbError {
        if !self.is_unique_violation() {
            return self;
        }
        let constraint = match &self {
            DbError::Database(sqlx::Error::Database(db_err)) => {
                db_err.constraint().unwrap_or_default().to_string()
            }
            _ => String::new(),
        };
        CoreError::Conflict(format!("{entity} violates {constraint}")).into()
    }
}
