//! Server configuration
//!
//! Environment-variable configuration with sensible defaults, loaded once
//! at startup. `.env` files are honored via dotenvy in `main`.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    Invalid { var: String, message: String },
}

/// Full server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub models: ModelConfig,
    /// When set, every segmented line crop is written here as a PNG
    pub debug_line_dir: Option<PathBuf>,
    /// Upper bound on one document extraction run, in seconds
    pub ocr_timeout_secs: u64,
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Model artifact settings
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Root directory holding one artifact directory per catalog model
    pub dir: PathBuf,
    /// How many loaded models stay resident (1 = single active slot)
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig { port: 8080 },
            models: ModelConfig {
                dir: PathBuf::from("./models"),
                cache_capacity: 1,
            },
            debug_line_dir: None,
            ocr_timeout_secs: 300,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let port = parse_var("PORT", defaults.server.port)?;
        let models_dir = std::env::var("MODELS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.models.dir);
        let cache_capacity = parse_var("MODEL_CACHE_CAPACITY", defaults.models.cache_capacity)?;
        let debug_line_dir = std::env::var("DEBUG_LINE_DIR").ok().map(PathBuf::from);
        let ocr_timeout_secs = parse_var("OCR_TIMEOUT_SECS", defaults.ocr_timeout_secs)?;

        if cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "MODEL_CACHE_CAPACITY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            server: ServerConfig { port },
            models: ModelConfig {
                dir: models_dir,
                cache_capacity,
            },
            debug_line_dir,
            ocr_timeout_secs,
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
            var: var.to_string(),
            message: format!("{e}"),
        }),
        Err(_) => Ok(default),
    }
}
