//! Configuration loading for the KTV search service
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (applied by the binary after loading)
//! 2. Environment variables (`KTV_*`)
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! The TOML file is located by explicit path, then `KTV_CONFIG`, then
//! `<config_dir>/ktv/ktv-search.toml`. A missing file is not an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "KTV_CONFIG";

/// Company value that asks the upstream for every vendor at once
pub const CATCH_ALL_COMPANY: &str = "全部";

/// Vendors queried individually, in sort-priority order
pub const DEFAULT_VENDORS: [&str; 10] = [
    "錢櫃", "好樂迪", "銀櫃", "音圓", "金嗓", "弘音", "星據點", "音霸", "大東", "點將家",
];

/// Upper bound on concurrent upstream requests
pub const MAX_CONCURRENCY_CEILING: usize = 8;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Default: 5730
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Upstream catalog and fan-out policy
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme and host of the catalog service
    pub base_url: String,
    /// Path of the song query endpoint
    pub endpoint: String,
    /// Total time allowed for one upstream request
    pub request_timeout_ms: u64,
    /// Time allowed to establish a connection
    pub connect_timeout_ms: u64,
    /// Minimum spacing between request starts, shared by all workers
    pub request_interval_ms: u64,
    /// Requests allowed in flight at once (clamped to 1..=8)
    pub max_concurrency: usize,
    /// Overall budget for one search; unfinished work is dropped after it
    pub search_deadline_ms: u64,
    /// Query only the catch-all company instead of every vendor
    pub catch_all_only: bool,
    /// Pause between keywords of a batch search
    pub batch_pause_ms: u64,
    /// Companies to fan out over, catch-all first
    pub companies: Vec<String>,
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        let mut companies = vec![CATCH_ALL_COMPANY.to_string()];
        companies.extend(DEFAULT_VENDORS.iter().map(|v| v.to_string()));

        Self {
            base_url: "https://song.corp.com.tw".to_string(),
            endpoint: "/api/song.aspx".to_string(),
            request_timeout_ms: 8_000,
            connect_timeout_ms: 5_000,
            request_interval_ms: 300,
            max_concurrency: 4,
            search_deadline_ms: 60_000,
            catch_all_only: false,
            batch_pause_ms: 5_000,
            companies,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Companies the fan-out actually queries
    pub fn effective_companies(&self) -> Vec<String> {
        if self.catch_all_only {
            vec![CATCH_ALL_COMPANY.to_string()]
        } else {
            self.companies.clone()
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Apply `KTV_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(host) = env_string("KTV_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("KTV_PORT")? {
            self.server.port = port;
        }
        if let Some(level) = env_string("KTV_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(url) = env_string("KTV_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Some(n) = env_parse::<usize>("KTV_MAX_CONCURRENCY")? {
            self.upstream.max_concurrency = n;
        }
        if let Some(ms) = env_parse::<u64>("KTV_REQUEST_INTERVAL_MS")? {
            self.upstream.request_interval_ms = ms;
        }
        if let Some(ms) = env_parse::<u64>("KTV_REQUEST_TIMEOUT_MS")? {
            self.upstream.request_timeout_ms = ms;
        }
        if let Some(ms) = env_parse::<u64>("KTV_SEARCH_DEADLINE_MS")? {
            self.upstream.search_deadline_ms = ms;
        }
        if let Some(flag) = env_parse::<bool>("KTV_CATCH_ALL_ONLY")? {
            self.upstream.catch_all_only = flag;
        }
        if let Some(ms) = env_parse::<u64>("KTV_BATCH_PAUSE_MS")? {
            self.upstream.batch_pause_ms = ms;
        }
        Ok(())
    }

    /// Check invariants, clamping the concurrency limit into range
    pub fn validate(&mut self) -> Result<()> {
        let upstream = &mut self.upstream;

        if !(upstream.base_url.starts_with("http://") || upstream.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "upstream.base_url must be an http(s) URL, got '{}'",
                upstream.base_url
            )));
        }
        if upstream.request_timeout_ms == 0 || upstream.connect_timeout_ms == 0 {
            return Err(Error::Config("upstream timeouts must be non-zero".to_string()));
        }
        if upstream.request_interval_ms == 0 {
            return Err(Error::Config(
                "upstream.request_interval_ms must be non-zero".to_string(),
            ));
        }
        if upstream.search_deadline_ms == 0 {
            return Err(Error::Config(
                "upstream.search_deadline_ms must be non-zero".to_string(),
            ));
        }
        if upstream.companies.is_empty() {
            return Err(Error::Config("upstream.companies must not be empty".to_string()));
        }
        if let Some(pos) = upstream.companies.iter().position(|c| c.trim().is_empty()) {
            return Err(Error::Config(format!(
                "upstream.companies[{}] is blank",
                pos
            )));
        }

        let clamped = upstream.max_concurrency.clamp(1, MAX_CONCURRENCY_CEILING);
        if clamped != upstream.max_concurrency {
            warn!(
                "upstream.max_concurrency {} out of range, using {}",
                upstream.max_concurrency, clamped
            );
            upstream.max_concurrency = clamped;
        }

        Ok(())
    }
}

/// Locate the config file: explicit path, then `KTV_CONFIG`, then platform default
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_string(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    default_config_path()
}

/// `<config_dir>/ktv/ktv-search.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ktv").join("ktv-search.toml"))
}

/// Load configuration from file (if present) and environment, then validate
///
/// An explicitly named file that does not exist is an error; a missing
/// default file falls back to compiled defaults with a warning.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(explicit) {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
            info!("Loaded configuration from {}", path.display());
            TomlConfig::from_toml_str(&content)?
        }
        Some(path) if explicit.is_some() => {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            TomlConfig::default()
        }
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            TomlConfig::default()
        }
    };

    config.apply_env_overrides()?;
    config.validate()?;
    debug!(?config, "Effective configuration");
    Ok(config)
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{}='{}' is invalid: {}", name, raw, e))),
    }
}
