//! Server configuration: TOML file + CLI overrides.

use scrawl_core::{ScrawlError, ScrawlResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
}

/// `[server]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_send_queue")]
    pub send_queue: usize,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            send_queue: default_send_queue(),
            max_message_size: default_max_message_size(),
            stats_interval: default_stats_interval(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_send_queue() -> usize {
    64
}
fn default_max_message_size() -> usize {
    1_048_576
}
fn default_stats_interval() -> u64 {
    60
}

/// Values given on the command line; `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub send_queue: Option<usize>,
    pub max_message_size: Option<usize>,
    pub stats_interval: Option<u64>,
}

/// Resolved server configuration (CLI overrides applied).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Capacity of each connection's outbound queue, in messages.
    pub send_queue: usize,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
    /// Seconds between stats log lines; 0 disables them.
    pub stats_interval: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_section(ServerSection::default(), ConfigOverrides::default())
    }
}

impl ServerConfig {
    /// Load config from TOML file, then apply CLI overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> ScrawlResult<Self> {
        let file_config = match config_path {
            Some(path) => {
                let expanded = expand_tilde(path);
                if expanded.exists() {
                    info!(path = %expanded.display(), "loading config file");
                    let content = std::fs::read_to_string(&expanded)?;
                    Self::parse_file(&content)?
                } else {
                    info!(path = %expanded.display(), "config file not found, using defaults");
                    ConfigFile::default()
                }
            }
            None => ConfigFile::default(),
        };

        let config = Self::from_section(file_config.server, overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse the contents of a config file.
    pub fn parse_file(content: &str) -> ScrawlResult<ConfigFile> {
        toml::from_str::<ConfigFile>(content)
            .map_err(|e| ScrawlError::Config(format!("config parse error: {e}")))
    }

    fn from_section(section: ServerSection, overrides: ConfigOverrides) -> Self {
        Self {
            host: overrides.host.unwrap_or(section.host),
            port: overrides.port.unwrap_or(section.port),
            send_queue: overrides.send_queue.unwrap_or(section.send_queue),
            max_message_size: overrides
                .max_message_size
                .unwrap_or(section.max_message_size),
            stats_interval: overrides.stats_interval.unwrap_or(section.stats_interval),
        }
    }

    fn validate(&self) -> ScrawlResult<()> {
        if self.send_queue == 0 {
            return Err(ScrawlError::Config("send_queue must be at least 1".into()));
        }
        if self.max_message_size == 0 {
            return Err(ScrawlError::Config(
                "max_message_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
