use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

pub const DEFAULT_STATS_URL: &str = "https://orchestrator.strn.pl/stats";
const DEFAULT_DB_PATH: &str = "data/strn.sqlite";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings from `STRN_*` environment variables over built-in defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub stats_url: String,
    pub db_path: PathBuf,
    pub http_timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix("STRN").try_parsing(true))
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("stats_url", DEFAULT_STATS_URL)?
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("http_timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS)?
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
