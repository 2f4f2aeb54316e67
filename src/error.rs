//! Error taxonomy for staging and rendering.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::validation::ValidationErrors;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{drawable} failed running {command}: {message}")]
    Execution {
        drawable: String,
        command: String,
        message: String,
    },

    /// `drawable` is empty until [`RenderError::for_drawable`] names the stage.
    #[error("{drawable} failed to spawn {command}: {source}")]
    Spawn {
        drawable: String,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{drawable} timed out running {command} after {limit:?}")]
    Timeout {
        drawable: String,
        command: String,
        limit: Duration,
    },

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Document requires engine >= {0}, current is {1}")]
    EngineVersionMismatch(String, String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RenderError {
    pub fn execution(
        drawable: impl Into<String>,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Execution {
            drawable: drawable.into(),
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn spawn(command: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            drawable: String::new(),
            command: command.into(),
            source,
        }
    }

    pub fn timeout(command: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            drawable: String::new(),
            command: command.into(),
            limit,
        }
    }

    /// Attach the stage that was running when a process error surfaced.
    pub fn for_drawable(self, label: &str) -> Self {
        match self {
            Self::Spawn {
                drawable,
                command,
                source,
            } if drawable.is_empty() => Self::Spawn {
                drawable: label.to_string(),
                command,
                source,
            },
            Self::Timeout {
                drawable,
                command,
                limit,
            } if drawable.is_empty() => Self::Timeout {
                drawable: label.to_string(),
                command,
                limit,
            },
            other => other,
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
