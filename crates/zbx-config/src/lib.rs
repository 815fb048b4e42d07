//! Configuration file support for zbx (`zbx.toml`).
//!
//! Two tables: `[api]` for everything about the connection and `[app]` for
//! tool behavior. All fields have defaults so a minimal config is just the
//! server URL:
//!
//! ```toml
//! [api]
//! url = "https://zabbix.example.com"
//! ```
//!
//! `ZABBIX_URL` overrides the configured URL; credentials from the
//! environment are handled by the credential resolver, not here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE: &str = "zbx.toml";

/// Environment variable overriding `api.url`.
pub const ENV_URL: &str = "ZABBIX_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no Zabbix URL configured; set api.url in {CONFIG_FILE} or {ENV_URL}")]
    MissingUrl,
}

/// Connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Zabbix web interface. The `/api_jsonrpc.php` suffix
    /// is optional; the client canonicalises either way.
    #[serde(default)]
    pub url: String,

    /// Per-request timeout in seconds. `0` means no timeout.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Verify TLS certificates.
    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    /// Username used for session lookups and password logins.
    #[serde(default)]
    pub username: Option<String>,

    /// Password. Prefer the auth file or environment over this.
    #[serde(default)]
    pub password: Option<String>,

    /// Long-lived API token.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: default_timeout(),
            verify_ssl: true,
            username: None,
            password: None,
            auth_token: None,
        }
    }
}

/// Tool behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Persist session IDs obtained from password logins.
    #[serde(default = "default_true")]
    pub use_session_file: bool,

    /// Session file location override.
    #[serde(default)]
    pub session_file: Option<PathBuf>,

    /// Load session/auth files even when their permissions are not 0600.
    #[serde(default)]
    pub allow_insecure_auth_file: bool,

    /// Directory exported files land in.
    #[serde(default = "default_export_directory")]
    pub export_directory: PathBuf,

    /// Export serialization format (json, yaml, xml, php).
    #[serde(default = "default_export_format")]
    pub export_format: String,

    /// Append a timestamp to exported filenames.
    #[serde(default)]
    pub export_timestamps: bool,

    /// Use the legacy `zabbix_export_<type>_<name>_<id>` filename scheme.
    #[serde(default)]
    pub legacy_filenames: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            use_session_file: true,
            session_file: None,
            allow_insecure_auth_file: false,
            export_directory: default_export_directory(),
            export_format: default_export_format(),
            export_timestamps: false,
            legacy_filenames: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub app: AppConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// The effective server URL: `ZABBIX_URL` wins over the config file.
    pub fn url(&self) -> Result<String, ConfigError> {
        let url = std::env::var(ENV_URL)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.api.url.clone());
        if url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        Ok(url)
    }

    /// Request timeout; `0` in the file maps to "no timeout".
    pub fn timeout(&self) -> Option<Duration> {
        (self.api.timeout > 0).then(|| Duration::from_secs(self.api.timeout))
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_export_directory() -> PathBuf {
    PathBuf::from("exports")
}

fn default_export_format() -> String {
    "json".to_string()
}

/// Default config file location (`<config dir>/zbx/zbx.toml`).
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("zbx"))
        .unwrap_or_else(|| PathBuf::from(".zbx"))
        .join(CONFIG_FILE)
}

/// Load configuration from a specific file path.
///
/// A missing file yields the default configuration; a malformed one is an
/// error.
pub fn load_config_from_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration from the given path, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(p) => load_config_from_file(p),
        None => load_config_from_file(&default_config_path()),
    }
}
