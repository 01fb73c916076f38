//! Cloud task error types

use std::error::Error as _;
use thiserror::Error;

/// Errors raised while reconciling task resources
#[derive(Error, Debug)]
pub enum CloudError {
    /// The provider reports the resource as absent
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid machine image format: {0} (use user@publisher:offer:sku:version[:#plan])")]
    InvalidImage(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A resource was created before one of its dependencies had a live handle
    #[error("Dependency not ready: {0}")]
    DependencyNotReady(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Failed to render machine script: {0}")]
    Script(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }
}

impl From<tera::Error> for CloudError {
    fn from(err: tera::Error) -> Self {
        // tera buries the useful part of the message in the source chain
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        CloudError::Script(message)
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
