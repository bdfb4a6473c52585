use std::path::PathBuf;
use std::time::Duration;

use super::error::{MdnaError, Result};

pub const DEFAULT_USER_AGENT: &str = "software@example.com";

#[derive(Clone, Debug)]
pub struct MdnaConfig {
    pub user_agent: String,
    pub data_dir: PathBuf,
    pub cache_ttl: Duration,
    pub max_concurrent: usize,
}

impl Default for MdnaConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            data_dir: PathBuf::from("data"),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            max_concurrent: 10,
        }
    }
}

impl MdnaConfig {
    /// Reads settings from the environment. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let user_agent =
            std::env::var("SEC_USER_AGENT").unwrap_or_else(|_| defaults.user_agent.clone());
        if user_agent.trim().is_empty() {
            return Err(MdnaError::Config(
                "SEC_USER_AGENT must not be empty; SEC requires a contact string".to_string(),
            ));
        }

        let data_dir = std::env::var("MDNA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let cache_ttl = match std::env::var("MDNA_CACHE_TTL_HOURS") {
            Ok(raw) => {
                let hours: u64 = raw.trim().parse().map_err(|_| {
                    MdnaError::Config(format!("MDNA_CACHE_TTL_HOURS is not a number: {}", raw))
                })?;
                Duration::from_secs(hours * 60 * 60)
            }
            Err(_) => defaults.cache_ttl,
        };

        let max_concurrent = match std::env::var("MDNA_MAX_CONCURRENT") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    MdnaError::Config(format!("MDNA_MAX_CONCURRENT must be a positive integer: {}", raw))
                })?,
            Err(_) => defaults.max_concurrent,
        };

        Ok(Self {
            user_agent,
            data_dir,
            cache_ttl,
            max_concurrent,
        })
    }

    pub fn edgar_dir(&self) -> PathBuf {
        self.data_dir.join("edgar")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("http_cache")
    }
}
