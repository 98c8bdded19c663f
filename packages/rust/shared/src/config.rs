//! Application configuration for schemewatch.
//!
//! User config lives at `~/.schemewatch/schemewatch.toml`.
//! CLI flags override config file values, which override defaults.
//! The admin token is never stored in the file — only the name of the
//! environment variable holding it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemeWatchError};
use crate::types::SourceConfig;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "schemewatch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".schemewatch";

// ---------------------------------------------------------------------------
// Config structs (matching schemewatch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-run limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Downstream ingest endpoint settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Fetch resilience policy.
    #[serde(default)]
    pub fetch: FetchPolicyConfig,
}

/// `[limits]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum items taken from one source per run.
    #[serde(default = "default_max_items")]
    pub max_items_per_source: usize,

    /// Maximum concurrent item chains within one source.
    #[serde(default = "default_item_concurrency")]
    pub item_concurrency: usize,

    /// Maximum candidate anchors collected from one listing page.
    #[serde(default = "default_anchor_cap")]
    pub anchor_cap: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_items_per_source: default_max_items(),
            item_concurrency: default_item_concurrency(),
            anchor_cap: default_anchor_cap(),
        }
    }
}

fn default_max_items() -> usize {
    40
}
fn default_item_concurrency() -> usize {
    6
}
fn default_anchor_cap() -> usize {
    80
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Downstream ingest endpoint URL.
    #[serde(default = "default_ingest_url")]
    pub url: String,

    /// Name of the env var holding the admin token (never the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            url: default_ingest_url(),
            token_env: default_token_env(),
        }
    }
}

fn default_ingest_url() -> String {
    "http://localhost:4000/v1/ingest".into()
}
fn default_token_env() -> String {
    "SCHEMEWATCH_ADMIN_TOKEN".into()
}

/// `[fetch]` section — resilience knobs for the fetch gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchPolicyConfig {
    /// Per-request GET timeout in seconds.
    #[serde(default = "default_get_timeout")]
    pub get_timeout_secs: u64,

    /// Best-effort HEAD timeout in seconds.
    #[serde(default = "default_head_timeout")]
    pub head_timeout_secs: u64,

    /// Transport-level retries beneath each individual request.
    #[serde(default = "default_transport_retries")]
    pub transport_retries: u32,

    /// Recent failures after which a host is put on cool-down.
    #[serde(default = "default_failure_threshold")]
    pub host_failure_threshold: u32,

    /// Cool-down window in seconds once the threshold is reached.
    #[serde(default = "default_skip_secs")]
    pub host_skip_secs: u64,

    /// Minimum seconds between repeated failure logs for one host.
    #[serde(default = "default_log_throttle")]
    pub log_throttle_secs: u64,
}

impl Default for FetchPolicyConfig {
    fn default() -> Self {
        Self {
            get_timeout_secs: default_get_timeout(),
            head_timeout_secs: default_head_timeout(),
            transport_retries: default_transport_retries(),
            host_failure_threshold: default_failure_threshold(),
            host_skip_secs: default_skip_secs(),
            log_throttle_secs: default_log_throttle(),
        }
    }
}

fn default_get_timeout() -> u64 {
    60
}
fn default_head_timeout() -> u64 {
    8
}
fn default_transport_retries() -> u32 {
    5
}
fn default_failure_threshold() -> u32 {
    8
}
fn default_skip_secs() -> u64 {
    10 * 60
}
fn default_log_throttle() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration — merged from config file + CLI flags,
/// with the admin token already resolved from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the sources file (JSON array of [`SourceConfig`]).
    pub sources_file: PathBuf,
    /// Path to the durable seen-file.
    pub seen_file: PathBuf,
    /// Downstream ingest endpoint URL.
    pub ingest_url: String,
    /// Resolved admin bearer token.
    pub admin_token: String,
    /// Maximum items taken from one source per run.
    pub max_items_per_source: usize,
    /// Maximum concurrent item chains within one source.
    pub item_concurrency: usize,
    /// Maximum candidate anchors collected from one listing page.
    pub anchor_cap: usize,
    /// Fetch resilience policy.
    pub fetch: FetchPolicyConfig,
}

impl PipelineConfig {
    /// Merge an [`AppConfig`] with the resolved token and file paths.
    pub fn from_app(
        config: &AppConfig,
        admin_token: String,
        sources_file: PathBuf,
        seen_file: PathBuf,
    ) -> Self {
        Self {
            sources_file,
            seen_file,
            ingest_url: config.ingest.url.clone(),
            admin_token,
            max_items_per_source: config.limits.max_items_per_source,
            item_concurrency: config.limits.item_concurrency,
            anchor_cap: config.limits.anchor_cap,
            fetch: config.fetch.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.schemewatch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SchemeWatchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.schemewatch/schemewatch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SchemeWatchError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SchemeWatchError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SchemeWatchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SchemeWatchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SchemeWatchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the admin token from the configured env var.
///
/// An absent or empty token is fatal: the pipeline must refuse to start
/// rather than run unauthenticated.
pub fn validate_admin_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.ingest.token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(SchemeWatchError::config(format!(
            "admin token not found. Set the {var_name} environment variable before running."
        ))),
    }
}

/// Load and validate the sources file: a JSON array of [`SourceConfig`].
///
/// A missing or unreadable sources file is fatal — there is nothing to run.
pub fn load_sources(path: &Path) -> Result<Vec<SourceConfig>> {
    let content = std::fs::read_to_string(path).map_err(|e| SchemeWatchError::io(path, e))?;

    let sources: Vec<SourceConfig> = serde_json::from_str(&content).map_err(|e| {
        SchemeWatchError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    if sources.is_empty() {
        return Err(SchemeWatchError::config(format!(
            "{} contains no sources",
            path.display()
        )));
    }

    for src in &sources {
        if src.id.is_empty() {
            return Err(SchemeWatchError::validation("source with empty id"));
        }
        url::Url::parse(&src.url).map_err(|e| {
            SchemeWatchError::validation(format!("source {}: invalid url {}: {e}", src.id, src.url))
        })?;
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("SCHEMEWATCH_ADMIN_TOKEN"));
        assert!(toml_str.contains("max_items_per_source"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.limits.max_items_per_source, 40);
        assert_eq!(parsed.limits.item_concurrency, 6);
        assert_eq!(parsed.fetch.host_failure_threshold, 8);
        assert_eq!(parsed.fetch.host_skip_secs, 600);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[ingest]
url = "https://store.example.in/v1/ingest"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.ingest.url, "https://store.example.in/v1/ingest");
        assert_eq!(config.ingest.token_env, "SCHEMEWATCH_ADMIN_TOKEN");
        assert_eq!(config.limits.anchor_cap, 80);
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let app = AppConfig::default();
        let pipeline = PipelineConfig::from_app(
            &app,
            "token".into(),
            PathBuf::from("sources.json"),
            PathBuf::from("seen.json"),
        );
        assert_eq!(pipeline.max_items_per_source, 40);
        assert_eq!(pipeline.item_concurrency, 6);
        assert_eq!(pipeline.ingest_url, "http://localhost:4000/v1/ingest");
    }

    #[test]
    fn admin_token_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.ingest.token_env = "SW_TEST_NONEXISTENT_TOKEN_12345".into();
        let result = validate_admin_token(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("token not found"));
    }

    #[test]
    fn sources_file_parses_and_validates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sources.json");
        std::fs::write(
            &path,
            r#"[
  {"id":"agri-rss","name":"Agri News","url":"https://news.example.in/rss","kind":"rss"},
  {"id":"pib-agri","name":"PIB Agriculture","url":"https://pib.example.in/rss.aspx","kind":"specialized","ministry":"PIB"}
]"#,
        )
        .expect("write sources");

        let sources = load_sources(&path).expect("load");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].ministry.as_deref(), Some("PIB"));
    }

    #[test]
    fn missing_sources_file_is_fatal() {
        let result = load_sources(Path::new("/nonexistent/sources.json"));
        assert!(matches!(result, Err(SchemeWatchError::Io { .. })));
    }

    #[test]
    fn empty_sources_file_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sources.json");
        std::fs::write(&path, "[]").expect("write");
        assert!(load_sources(&path).is_err());
    }
}
