use thiserror::Error;

#[derive(Error, Debug)]
pub enum CycleMapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config_manager::ConfigError),

    #[error("Data source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, CycleMapError>;
