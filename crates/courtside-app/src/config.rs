// Configuration loading and parsing (courtside.toml).

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use courtside_core::clock::{AlertWindow, LiveSettings};
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE: &str = "courtside.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub timezone: Tz,
    pub alert_window: AlertWindow,
    pub ws_port: u16,
    pub db_path: String,
}

impl Config {
    /// Engine settings derived from this config.
    pub fn live_settings(&self) -> LiveSettings {
        LiveSettings {
            timezone: self.timezone,
            alert_window: self.alert_window,
        }
    }
}

// ---------------------------------------------------------------------------
// courtside.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    clock: ClockSection,
    #[serde(default)]
    live: LiveSection,
    server: ServerSection,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ClockSection {
    timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct LiveSection {
    alert_lead_seconds: u32,
    alert_lag_seconds: u32,
}

impl Default for LiveSection {
    fn default() -> Self {
        let window = AlertWindow::default();
        LiveSection {
            alert_lead_seconds: window.lead_seconds,
            alert_lag_seconds: window.lag_seconds,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/courtside.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()` for normal startup.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;
    validate(file)
}

/// Seed `config/courtside.toml` from `defaults/courtside.toml` when it is
/// missing. Returns the path written, or `None` when a config was already in
/// place. An existing config is never overwritten.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    let defaults = std::fs::read(&source).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!(
            "no {} and no usable {} in {}: {e}",
            target.display(),
            source.display(),
            base_dir.display()
        ),
    })?;

    let copy_error = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to write {}: {e}", target.display()),
    };
    if let Some(config_dir) = target.parent() {
        std::fs::create_dir_all(config_dir).map_err(copy_error)?;
    }
    std::fs::write(&target, defaults).map_err(copy_error)?;

    Ok(Some(target))
}

/// Load config relative to the current working directory, seeding it from
/// the shipped defaults on first run.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(file: ConfigFile) -> Result<Config, ConfigError> {
    let timezone: Tz = file
        .clock
        .timezone
        .trim()
        .parse()
        .map_err(|e| ConfigError::ValidationError {
            field: "clock.timezone".into(),
            message: format!("unknown IANA zone `{}`: {e}", file.clock.timezone),
        })?;

    if file.live.alert_lead_seconds == 0 {
        return Err(ConfigError::ValidationError {
            field: "live.alert_lead_seconds".into(),
            message: "must be greater than 0".into(),
        });
    }

    if file.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if file.database.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(Config {
        timezone,
        alert_window: AlertWindow {
            lead_seconds: file.live.alert_lead_seconds,
            lag_seconds: file.live.alert_lag_seconds,
        },
        ws_port: file.server.port,
        db_path: file.database.path,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
