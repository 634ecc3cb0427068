use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for CycleMap
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CycleMapConfig {
    /// Hierarchy building and view defaults
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Where tracker snapshots are read from
    #[serde(default)]
    pub source: SourceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Initiative id given to roadmap items that carry none
    #[serde(default = "default_unassigned_initiative_id")]
    pub unassigned_initiative_id: String,

    /// Display name for the unassigned initiative
    #[serde(default = "default_unassigned_initiative_name")]
    pub unassigned_initiative_name: String,

    /// View selected when a filter manager is created: "roadmap" or "cycle-overview"
    #[serde(default = "default_view")]
    pub default_view: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            unassigned_initiative_id: default_unassigned_initiative_id(),
            unassigned_initiative_name: default_unassigned_initiative_name(),
            default_view: default_view(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    /// JSON snapshot exported from the tracker
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

pub const VIEW_NAMES: [&str; 2] = ["roadmap", "cycle-overview"];

// Default value functions
fn default_unassigned_initiative_id() -> String {
    "unassigned".to_string()
}
fn default_unassigned_initiative_name() -> String {
    "Unassigned".to_string()
}
fn default_view() -> String {
    "roadmap".to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with layered sources
pub struct ConfigManager {
    config: CycleMapConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.cyclemap.toml, then ~/.cyclemap/config.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load one explicit config file, still honouring environment overrides.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();

        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: CycleMapConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!(path = %path.display(), "Configuration loaded"),
            None => info!("Configuration loaded from defaults"),
        }
        info!(
            default_view = %config.pipeline.default_view,
            snapshot = ?config.source.snapshot_path,
            "Pipeline settings"
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".cyclemap.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .cyclemap.env: {}", e);
                }
            }
        }
    }

    /// Search order:
    /// 1. ./.cyclemap.toml
    /// 2. ~/.cyclemap/config.toml
    /// 3. Defaults
    fn load_config_file() -> Result<(CycleMapConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".cyclemap.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".cyclemap").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((CycleMapConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<CycleMapConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(config: CycleMapConfig) -> CycleMapConfig {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut config: CycleMapConfig, lookup: F) -> CycleMapConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("CYCLEMAP_UNASSIGNED_ID") {
            config.pipeline.unassigned_initiative_id = id;
        }
        if let Some(name) = lookup("CYCLEMAP_UNASSIGNED_NAME") {
            config.pipeline.unassigned_initiative_name = name;
        }
        if let Some(view) = lookup("CYCLEMAP_DEFAULT_VIEW") {
            config.pipeline.default_view = view;
        }
        if let Some(path) = lookup("CYCLEMAP_SNAPSHOT") {
            config.source.snapshot_path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup("CYCLEMAP_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("CYCLEMAP_LOG_FORMAT") {
            config.logging.format = format;
        }

        config
    }

    fn validate_config(config: &CycleMapConfig) -> Result<(), ConfigError> {
        if config.pipeline.unassigned_initiative_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "unassigned_initiative_id must not be empty".to_string(),
            ));
        }

        if !VIEW_NAMES.contains(&config.pipeline.default_view.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid default view: {}. Must be one of: {}",
                config.pipeline.default_view,
                VIEW_NAMES.join(", ")
            )));
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, compact, json",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CycleMapConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = CycleMapConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}
