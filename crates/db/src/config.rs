use cshare_core::error::CoreError;

/// Default connection pool size.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Load configuration from the environment, reading `.env` first if
    /// present.
    ///
    /// | Env Var              | Default     |
    /// |----------------------|-------------|
    /// | `DATABASE_URL`       | (required)  |
    /// | `DB_MAX_CONNECTIONS` | `20`        |
    pub fn from_env() -> Result<Self, CoreError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CoreError::Validation("DATABASE_URL must be set".into()))?;

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                CoreError::Validation(format!("DB_MAX_CONNECTIONS must be a valid u32, got {raw}"))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}
