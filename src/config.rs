//! Layered configuration: defaults, config file, `PROWMON_*` env, CLI flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str =
    "https://prow.ci.openshift.org/prowjobs.js?omit=annotations,decoration_config,pod_spec";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prow job listing endpoint.
    pub api_url: String,
    /// Directory for the response cache and the TUI log file.
    pub cache_dir: PathBuf,
    /// How long a cached response stays valid.
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    /// Lines kept from the end of a build log.
    pub log_tail_lines: usize,
    /// Case-insensitive substring a job name must contain.
    pub job_filter: String,
    pub llm_model: String,
    pub llm_max_tokens: u32,
    pub verbose: bool,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            cache_dir: default_cache_dir(),
            cache_ttl_secs: 30 * 60,
            request_timeout_secs: 120,
            log_tail_lines: 5000,
            job_filter: "vsphere".to_string(),
            llm_model: "claude-sonnet-4-20250514".to_string(),
            llm_max_tokens: 1024,
            verbose: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Build the config. `overrides` is any serializable set of CLI flags;
    /// fields it serializes win over file and environment values.
    pub fn new<T: Serialize>(config_file: Option<PathBuf>, overrides: Option<&T>) -> Result<Self> {
        let file = config_file
            .or_else(|| std::env::var_os("PROWMON_CONFIG").map(PathBuf::from))
            .unwrap_or_else(default_config_file);

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed("PROWMON_").ignore(&["config"]));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment
            .extract()
            .with_context(|| format!("Invalid configuration (file: {})", file.display()))
    }

    pub fn log_file(&self) -> PathBuf {
        self.cache_dir.join("prowmon.log")
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("prowmon")
}

fn default_config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prowmon")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Flags {
        #[serde(skip_serializing_if = "Option::is_none")]
        log_tail_lines: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        verbose: Option<bool>,
    }

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            AppConfig::new(Some(dir.path().join("missing.toml")), None::<&Flags>).unwrap();
        assert_eq!(config.cache_ttl_secs, 1800);
        assert_eq!(config.log_tail_lines, 5000);
        assert_eq!(config.job_filter, "vsphere");
        assert!(config.api_url.starts_with("https://prow.ci.openshift.org/"));
    }

    #[test]
    fn file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_tail_lines = 200\ncache_ttl_secs = 60\n").unwrap();

        let flags = Flags {
            log_tail_lines: Some(10),
            verbose: None,
        };
        let config = AppConfig::new(Some(path), Some(&flags)).unwrap();
        assert_eq!(config.log_tail_lines, 10);
        assert_eq!(config.cache_ttl_secs, 60);
        assert!(!config.verbose);
    }
}
