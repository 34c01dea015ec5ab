//! Database configuration

use serde::{Deserialize, Serialize};

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub postgres_url: String,
    /// Maximum PostgreSQL connections
    pub pg_max_connections: u32,
    /// Minimum PostgreSQL connections
    pub pg_min_connections: u32,
    /// Connection acquire timeout in seconds
    pub pg_acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/mlmart".to_string()),
            pg_max_connections: 50,
            pg_min_connections: 2,
            pg_acquire_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// Create config from environment variables, loading `.env` first if present.
    ///
    /// Falls back to [`Default`] for anything not set.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            postgres_url: std::env::var("DATABASE_URL").unwrap_or(defaults.postgres_url),
            pg_max_connections: env_parse("PG_MAX_CONNECTIONS")
                .unwrap_or(defaults.pg_max_connections),
            pg_min_connections: env_parse("PG_MIN_CONNECTIONS")
                .unwrap_or(defaults.pg_min_connections),
            pg_acquire_timeout_secs: env_parse("PG_ACQUIRE_TIMEOUT")
                .unwrap_or(defaults.pg_acquire_timeout_secs),
        }
    }

    /// Mask sensitive parts of the PostgreSQL URL for logging
    pub fn postgres_url_masked(&self) -> String {
        mask_url(&self.postgres_url)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn mask_url(url: &str) -> String {
    // Simple masking: replace password with ***
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..scheme_end + 3];
            let after_at = &url[at_pos..];

            let user_pass = &url[scheme_end + 3..at_pos];
            if let Some(colon_pos) = user_pass.find(':') {
                let user = &user_pass[..colon_pos];
                return format!("{}{}:***{}", scheme, user, after_at);
            }
        }
    }
    url.to_string()
}
