//! Application configuration for simreport.
//!
//! User config lives at `~/.simreport/simreport.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SimReportError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "simreport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".simreport";

/// OpenRouter API root; `/chat/completions` is appended per request.
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

// ---------------------------------------------------------------------------
// Config structs (matching simreport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Report discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Derived-parameter settings.
    #[serde(default)]
    pub derived: DerivedConfig,

    /// Values written to the categorical columns of every row.
    #[serde(default)]
    pub row_defaults: RowDefaults,
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for parameter extraction.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// API root URL.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Report text beyond this many characters is not sent to the model.
    #[serde(default = "default_max_report_chars")]
    pub max_report_chars: usize,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_report_chars: default_max_report_chars(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "anthropic/claude-3-opus".into()
}
fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("valid default base URL")
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_report_chars() -> usize {
    4_000
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// File extensions treated as reports (without the dot, any case).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["pdf".into()]
}

/// What the derived-parameter calculator does with a missing input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingInputPolicy {
    /// Treat missing or non-numeric inputs as 0.0.
    #[default]
    Zero,
    /// Leave a derived value null when any of its inputs is missing.
    NotAvailable,
}

/// `[derived]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivedConfig {
    #[serde(default)]
    pub missing_inputs: MissingInputPolicy,
}

/// `[row_defaults]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDefaults {
    #[serde(default = "default_bridge_type")]
    pub bridge_type: String,
    #[serde(default = "default_symmetry")]
    pub symmetry: i64,
    #[serde(default = "default_joint_design")]
    pub joint_design: String,
    #[serde(default = "default_load_type")]
    pub load_type: String,
    #[serde(default = "default_support_type")]
    pub support_type: String,
}

impl Default for RowDefaults {
    fn default() -> Self {
        Self {
            bridge_type: default_bridge_type(),
            symmetry: default_symmetry(),
            joint_design: default_joint_design(),
            load_type: default_load_type(),
            support_type: default_support_type(),
        }
    }
}

fn default_bridge_type() -> String {
    "Truss".into()
}
fn default_symmetry() -> i64 {
    1
}
fn default_joint_design() -> String {
    "Bonded".into()
}
fn default_load_type() -> String {
    "Point".into()
}
fn default_support_type() -> String {
    "Fixed".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.simreport/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SimReportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.simreport/simreport.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| SimReportError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SimReportError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SimReportError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SimReportError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SimReportError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the OpenRouter API key.
///
/// An explicit key (from the CLI) wins; otherwise the env var named by
/// `openrouter.api_key_env` must be set and non-empty.
pub fn resolve_api_key(config: &AppConfig, explicit: Option<&str>) -> Result<String> {
    if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(SimReportError::config(format!(
            "OpenRouter API key not found. Pass --api-key or set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("missing_inputs = \"zero\""));
        assert!(toml_str.contains("Truss"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.openrouter.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(parsed.openrouter.base_url.as_str(), "https://openrouter.ai/api/v1");
        assert_eq!(parsed.openrouter.max_report_chars, 4_000);
        assert_eq!(parsed.discovery.extensions, vec!["pdf".to_string()]);
        assert_eq!(parsed.row_defaults, RowDefaults::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[openrouter]
default_model = "openai/gpt-4o"

[derived]
missing_inputs = "not_available"

[row_defaults]
bridge_type = "Arch"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.openrouter.default_model, "openai/gpt-4o");
        assert_eq!(config.openrouter.timeout_secs, 120);
        assert_eq!(config.derived.missing_inputs, MissingInputPolicy::NotAvailable);
        assert_eq!(config.row_defaults.bridge_type, "Arch");
        assert_eq!(config.row_defaults.joint_design, "Bonded");
    }

    #[test]
    fn api_key_missing_env_is_config_error() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openrouter.api_key_env = "SIMREPORT_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&config, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn explicit_api_key_wins() {
        let mut config = AppConfig::default();
        config.openrouter.api_key_env = "SIMREPORT_TEST_NONEXISTENT_KEY_67890".into();
        let key = resolve_api_key(&config, Some("sk-test")).unwrap();
        assert_eq!(key, "sk-test");
    }
}
