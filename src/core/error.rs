use thiserror::Error;

use crate::core::types::{ActionType, Role};

#[derive(Error, Debug)]
pub enum AcpError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Action {action} cannot be taken by the {expected}")]
    RoleMismatch { action: ActionType, expected: Role },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWriteError(#[from] toml::ser::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AcpError>;
