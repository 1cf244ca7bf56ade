//! Error types for document loading and the query service.

use thiserror::Error;

use crate::service::ServiceStatus;

/// Document-level failure. Any of these aborts the whole parse.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document at byte {position}: {message}")]
    Malformed { position: u64, message: String },
}

impl ParseError {
    pub(crate) fn malformed(position: u64, message: impl Into<String>) -> Self {
        ParseError::Malformed {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn from_xml(position: u64, err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(io) => {
                ParseError::Io(std::io::Error::new(io.kind(), io.to_string()))
            }
            other => ParseError::malformed(position, other.to_string()),
        }
    }
}

/// Rejections and failures reported by [`crate::QueryService`]
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("operation rejected: service is {status}")]
    Busy { status: ServiceStatus },

    #[error("load failed: {0}")]
    Load(#[from] ParseError),

    #[error("worker task failed: {0}")]
    Worker(String),
}
