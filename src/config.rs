// Configuration loading and parsing (config/pickem.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

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
// pickem.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire pickem.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    draft: DraftConfig,
    gateway: GatewayConfig,
    storage: StorageConfig,
    user: UserSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftConfig {
    /// Total currency available to spend across all slots.
    pub budget_cap: u32,
    /// Number of draft slots. The product requires exactly ten; kept
    /// configurable so tests can exercise smaller sessions.
    pub slot_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the hosted document backend, e.g. "https://api.example.com".
    pub base_url: String,
    /// Bearer token sent with every request. Optional for emulator use.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Object-store folder holding player pictures.
    pub picture_prefix: String,
    /// URL handed out when no picture matches or the lookup fails.
    pub placeholder_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct UserSection {
    user_id: String,
}

/// The assembled application config.
#[derive(Debug, Clone)]
pub struct Config {
    pub draft: DraftConfig,
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
    /// Document id in the `users` collection whose pick list is written.
    pub user_id: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/pickem.toml` relative to the
/// given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_path = base_dir.join("config").join("pickem.toml");
    let text = read_file(&config_path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    let config = Config {
        draft: file.draft,
        gateway: file.gateway,
        storage: file.storage,
        user_id: file.user.user_id,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        // Skip .example template files
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
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

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.draft.budget_cap == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.budget_cap".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.draft.slot_count == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.slot_count".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.gateway.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "gateway.base_url".into(),
            message: "must not be empty".into(),
        });
    }

    if config.gateway.timeout_seconds == 0 {
        return Err(ConfigError::ValidationError {
            field: "gateway.timeout_seconds".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.user_id.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "user.user_id".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
