use anyhow::{Context, Result};
use std::env;
use tracing::warn;

pub const DEFAULT_CACHE_MAX_AGE: u64 = 86_400;
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: Option<String>,
    pub tvdb_api_key: Option<String>,
    pub betaseries_api_key: Option<String>,
    pub cors_allowed: Vec<String>,
    pub cache_max_age: u64,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            tvdb_api_key: None,
            betaseries_api_key: None,
            cors_allowed: vec!["*".to_string()],
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let cors_allowed = get("CORS_ALLOWED")
            .map(|raw| parse_origins(&raw))
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);
        let cache_max_age = match get("CACHE_MAX_AGE") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("CACHE_MAX_AGE must be a number of seconds, got '{}'", raw))?,
            None => DEFAULT_CACHE_MAX_AGE,
        };
        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a valid port, got '{}'", raw))?,
            None => DEFAULT_PORT,
        };

        let config = Self {
            tmdb_api_key: get("TMDB_API_KEY"),
            tvdb_api_key: get("TVDB_API_KEY"),
            betaseries_api_key: get("BETASERIES_API_KEY"),
            cors_allowed,
            cache_max_age,
            port,
        };
        config.warn_missing_keys();
        Ok(config)
    }

    fn warn_missing_keys(&self) {
        let keys = [
            ("TMDB_API_KEY", &self.tmdb_api_key),
            ("TVDB_API_KEY", &self.tvdb_api_key),
            ("BETASERIES_API_KEY", &self.betaseries_api_key),
        ];
        for (name, value) in keys {
            if value.is_none() {
                warn!("{} is not set; routes that need it will answer 500", name);
            }
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
