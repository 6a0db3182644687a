use crate::constants::{DEFAULT_API_URL, INTERMEDIATE_DIR, MART_DIR, RAW_DIR};
use crate::error::{PipelineError, Result};
use crate::ingest::retry::RetryPolicy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
    pub backoff_factor: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub size: u64,
    pub total_records: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            params: BTreeMap::from([("_birthday_start".to_string(), "1900-01-01".to_string())]),
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 1,
            backoff_factor: 2,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 10_000,
            total_records: 30_000,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs(self.backoff_base_secs),
            backoff_factor: self.backoff_factor,
        }
    }
}

/// Parses a raw `k=v&k=v` query string into a parameter map.
pub fn parse_query_string(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            PipelineError::Config(format!("query parameter '{}' is not of the form k=v", pair))
        })?;
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}

/// The three sibling data areas every pipeline run reads and writes.
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub raw: PathBuf,
    pub intermediate: PathBuf,
    pub mart: PathBuf,
}

impl DataLayout {
    pub fn under(root: &Path) -> Self {
        Self {
            raw: root.join(RAW_DIR),
            intermediate: root.join(INTERMEDIATE_DIR),
            mart: root.join(MART_DIR),
        }
    }

    /// Creates all data areas that do not exist yet.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.raw, &self.intermediate, &self.mart] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_persons_endpoint() {
        let config = Config::default();
        assert_eq!(config.api.url, DEFAULT_API_URL);
        assert_eq!(config.batch.size, 10_000);
        assert_eq!(config.api.retry.max_attempts, 3);
    }

    #[test]
    fn parses_query_string_pairs() {
        let params = parse_query_string("_gender=female&_birthday_start=1900-01-01").unwrap();
        assert_eq!(params.get("_gender").map(String::as_str), Some("female"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn rejects_malformed_query_string() {
        assert!(parse_query_string("_gender").is_err());
    }

    #[test]
    fn layout_nests_under_root() {
        let layout = DataLayout::under(Path::new("/tmp/pipeline"));
        assert!(layout.raw.ends_with("data/raw"));
        assert!(layout.mart.ends_with("data/mart"));
    }
}
