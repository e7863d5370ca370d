/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Stored timestamps are timezone-naive (`TIMESTAMP WITHOUT TIME ZONE`).
pub type Timestamp = chrono::NaiveDateTime;
