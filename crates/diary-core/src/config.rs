//! Application configuration
//!
//! Values come from the defaults, then `config.toml`, then `DIARY_*`
//! environment variables, each layer overriding the one before. Every
//! setting has a string key so the environment and `diary config set`
//! share one parser.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

const ENV_PREFIX: &str = "DIARY";

/// Default address of the place search proxy
pub const DEFAULT_SEARCH_URL: &str = "http://localhost:5000";

/// Default port for `diary serve`
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding diary.db
    pub data_dir: PathBuf,

    /// Base URL of the place search proxy
    pub search_url: String,

    /// Port the search proxy listens on
    pub port: u16,

    /// Write logs to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("food-diary"),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            port: DEFAULT_PORT,
            log_file: None,
        }
    }
}

impl Config {
    /// Keys accepted by [`Config::set`], in display order
    pub const KEYS: [&'static str; 4] = ["data_dir", "search_url", "port", "log_file"];

    /// Load from the default config file and the environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `path` (defaults if it is missing), then apply the environment
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file: {:?}", path))
            }
        };

        config.apply_env_overrides();
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", config.data_dir))?;
        Ok(config)
    }

    /// Parse TOML and apply the environment, without touching the disk
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Set one value from its string form
    ///
    /// An empty `log_file` (or `none`) turns file logging off.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => {
                if value.is_empty() {
                    bail!("data_dir cannot be empty");
                }
                self.data_dir = PathBuf::from(value);
            }
            "search_url" => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    bail!("search_url must start with http:// or https://");
                }
                self.search_url = value.trim_end_matches('/').to_string();
            }
            "port" => {
                self.port = match value.parse() {
                    Ok(port) if port > 0 => port,
                    _ => bail!("Invalid port '{}'. Use a number between 1 and 65535.", value),
                };
            }
            "log_file" => {
                self.log_file = match value {
                    "" | "none" => None,
                    path => Some(PathBuf::from(path)),
                };
            }
            _ => bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                Self::KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Current values as display strings, in [`Config::KEYS`] order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("data_dir", self.data_dir.display().to_string()),
            ("search_url", self.search_url.clone()),
            ("port", self.port.to_string()),
            (
                "log_file",
                self.log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
        ]
    }

    /// `DIARY_<KEY>` for every key; the bare `PORT` of hosting platforms
    /// is honoured when `DIARY_PORT` is absent
    fn apply_env_overrides(&mut self) {
        for key in Self::KEYS {
            let var = format!("{}_{}", ENV_PREFIX, key.to_uppercase());
            let value = match std::env::var(&var) {
                Ok(value) => value,
                Err(_) if key == "port" => match std::env::var("PORT") {
                    Ok(value) => value,
                    Err(_) => continue,
                },
                Err(_) => continue,
            };

            // An empty search URL keeps the configured one
            if key == "search_url" && value.is_empty() {
                continue;
            }
            if let Err(e) = self.set(key, &value) {
                warn!("Ignoring {}: {}", var, e);
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))
    }

    /// `$DIARY_CONFIG`, or `config.toml` under the platform config dir
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("food-diary")
            .join("config.toml")
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("diary.db")
    }
}
