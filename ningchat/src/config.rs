//! Configuration for the `ningchat` client.
//!
//! Layered with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/ningchat/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    account: AccountFileConfig,
    timers: TimersFileConfig,
    client: ClientFileConfig,
}

/// `[account]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AccountFileConfig {
    host: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

/// `[timers]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TimersFileConfig {
    roster_refresh_secs: Option<u64>,
    message_poll_secs: Option<u64>,
}

/// `[client]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ClientFileConfig {
    event_capacity: Option<usize>,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hostname of the Ning network, without scheme.
    pub host: Option<String>,
    /// Account email address.
    pub email: Option<String>,
    /// Account password.
    pub password: Option<String>,
    /// Roster refresh period.
    pub roster_refresh: Duration,
    /// Message poll period.
    pub message_poll: Duration,
    /// Capacity of the account event channel.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: None,
            email: None,
            password: None,
            roster_refresh: Duration::from_secs(60),
            message_poll: Duration::from_secs(180),
            event_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. If no `--config` is given, the default path
    /// (`~/.config/ningchat/config.toml`) is tried and silently
    /// ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or
    /// parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` to
    /// enable unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            host: cli.host.clone().or_else(|| file.account.host.clone()),
            email: cli.email.clone().or_else(|| file.account.email.clone()),
            password: cli.password.clone().or_else(|| file.account.password.clone()),
            roster_refresh: file
                .timers
                .roster_refresh_secs
                .map_or(defaults.roster_refresh, Duration::from_secs),
            message_poll: file
                .timers
                .message_poll_secs
                .map_or(defaults.message_poll, Duration::from_secs),
            event_capacity: file
                .client
                .event_capacity
                .unwrap_or(defaults.event_capacity),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Client for the Ning web-chat protocol")]
pub struct CliArgs {
    /// Hostname of the Ning network (e.g. `mynetwork.ning.com`).
    #[arg(long, env = "NING_HOST")]
    pub host: Option<String>,

    /// Account email address.
    #[arg(long, env = "NING_EMAIL")]
    pub email: Option<String>,

    /// Account password.
    #[arg(long, env = "NING_PASSWORD")]
    pub password: Option<String>,

    /// Path to config file (default: `~/.config/ningchat/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "NINGCHAT_LOG")]
    pub log_level: String,
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing
/// file is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available — use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("ningchat").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
