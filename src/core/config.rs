use crate::core::cache::CacheStore;
use crate::core::classifier::{Classifier, DEFAULT_MARKER_KEYWORD};
use crate::core::model::FilterCriteria;
use crate::core::source::CriteriaSource;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_retries() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            base_url: "http://localhost:8080".to_string(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FilterConfig {
    #[serde(default = "default_marker_keyword")]
    pub marker_keyword: String,
    #[serde(default = "default_true")]
    pub require_marker_keyword: bool,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
}

fn default_marker_keyword() -> String {
    DEFAULT_MARKER_KEYWORD.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            marker_keyword: default_marker_keyword(),
            require_marker_keyword: true,
            themes: Vec::new(),
            exclusions: Vec::new(),
        }
    }
}

impl FilterConfig {
    pub fn classifier(&self) -> Classifier {
        Classifier::new(&self.marker_keyword)
    }
}

impl CriteriaSource for FilterConfig {
    fn load_filter_criteria(&self) -> FilterCriteria {
        FilterCriteria::new(
            &self.themes,
            &self.exclusions,
            self.require_marker_keyword,
        )
    }
}

/// Per-namespace time-to-live, in seconds.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct CacheTtlConfig {
    pub fund_list: u64,
    pub fund_detail: u64,
    pub fund_dates: u64,
    pub holdings: u64,
    pub statistics: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        CacheTtlConfig {
            fund_list: 300,
            fund_detail: 600,
            fund_dates: 600,
            holdings: 180,
            statistics: 300,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub default_ttl_secs: u64,
    pub ttl: CacheTtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            default_ttl_secs: 300,
            ttl: CacheTtlConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn build_store(&self) -> CacheStore {
        if self.enabled {
            CacheStore::new(Duration::from_secs(self.default_ttl_secs))
        } else {
            CacheStore::disabled()
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct StatsConfig {
    pub default_limit: usize,
    pub min_duplicate_count: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            default_limit: 100,
            min_duplicate_count: 2,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "etfwatch", "etfwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
