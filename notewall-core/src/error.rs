use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotewallError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Store is disconnected")]
    Disconnected,

    #[error("Confirmation text does not match, type exactly: {expected}")]
    ConfirmationMismatch { expected: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, NotewallError>;
