use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("feed is not well-formed XML: {0}")]
    Parse(String),

    #[error("listing {index}: {message}")]
    Mapping { index: usize, message: String },

    #[error("storage operation failed: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl ImportError {
    pub fn parse(message: impl Into<String>) -> Self {
        ImportError::Parse(message.into())
    }

    pub fn mapping(index: usize, message: impl Into<String>) -> Self {
        ImportError::Mapping { index, message: message.into() }
    }

    /// Stable error kind carried in the `{ kind, message }` wire shape.
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::Parse(_) => "ParseError",
            ImportError::Mapping { .. } => "MappingError",
            ImportError::Storage(_) => "StorageError",
            ImportError::Timeout(_) => "TimeoutError",
            ImportError::Io(_) => "IoError",
            ImportError::Env(_) => "ConfigError",
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
