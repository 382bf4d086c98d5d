//! Engine Settings
//!
//! Runtime knobs for the engine: store deadlines, cache lifetime, batch
//! sizing and the sanity-check limits. Defaults can be overridden from
//! `MENU_CARBON_*` environment variables or a JSON/YAML settings file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

pub const ENV_PREFIX: &str = "MENU_CARBON_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Deadline for a single store read
    pub store_timeout_ms: u64,
    /// Lifetime of cached store tables; 0 disables the cache
    pub cache_ttl_secs: u64,
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    /// Items in flight within one batch
    pub batch_parallelism: usize,
    /// Totals above this are logged as suspicious
    pub max_carbon_footprint: f64,
    /// Allowed gap between the breakdown sum and the reported total
    pub sum_tolerance: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            store_timeout_ms: 5_000,
            cache_ttl_secs: 300,
            batch_size: 10,
            batch_pause_ms: 100,
            batch_parallelism: 4,
            max_carbon_footprint: 100.0,
            sum_tolerance: 0.01,
        }
    }
}

impl EngineSettings {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    /// Defaults overridden by `MENU_CARBON_*` variables (after `.env` is loaded).
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any `KEY -> value` source. Unparseable values are
    /// logged and ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn apply<T: std::str::FromStr>(lookup: &dyn Fn(&str) -> Option<String>, name: &str, slot: &mut T) {
            let key = format!("{}{}", ENV_PREFIX, name);
            if let Some(raw) = lookup(&key) {
                match raw.trim().parse::<T>() {
                    Ok(value) => *slot = value,
                    Err(_) => tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw),
                }
            }
        }

        apply(&lookup, "STORE_TIMEOUT_MS", &mut self.store_timeout_ms);
        apply(&lookup, "CACHE_TTL_SECS", &mut self.cache_ttl_secs);
        apply(&lookup, "BATCH_SIZE", &mut self.batch_size);
        apply(&lookup, "BATCH_PAUSE_MS", &mut self.batch_pause_ms);
        apply(&lookup, "BATCH_PARALLELISM", &mut self.batch_parallelism);
        apply(&lookup, "MAX_CARBON_FOOTPRINT", &mut self.max_carbon_footprint);
        apply(&lookup, "SUM_TOLERANCE", &mut self.sum_tolerance);

        if self.batch_size == 0 {
            self.batch_size = 1;
        }
        if self.batch_parallelism == 0 {
            self.batch_parallelism = 1;
        }
        self
    }
}

/// Reads and writes `EngineSettings` as JSON, or YAML for `.yaml`/`.yml` paths.
pub struct SettingsManager {
    path: PathBuf,
}

impl SettingsManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_yaml(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        )
    }

    /// Load settings, writing the defaults first if the file does not exist.
    pub async fn load(&self) -> Result<EngineSettings> {
        if !self.path.exists() {
            let default = EngineSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }
        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading settings {}", self.path.display()))?;
        let settings = if self.is_yaml() {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(settings)
    }

    pub async fn save(&self, settings: &EngineSettings) -> Result<()> {
        let content = if self.is_yaml() {
            serde_yaml::to_string(settings)?
        } else {
            serde_json::to_string_pretty(settings)?
        };
        fs::write(&self.path, content).await?;
        Ok(())
    }
}
