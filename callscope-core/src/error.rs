//! Typed error handling for callscope.
//!
//! Data-quality problems (a reference with no enclosing function, a name
//! with no definition) are recoverable and never abort a graph build.
//! Transport and service faults are fatal for the current operation.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for callscope operations.
#[derive(Error, Debug)]
pub enum CallscopeError {
    /// A qualified name has no matching definition in the index.
    #[error("No definition found for '{qualname}'")]
    NotFound { qualname: String },

    /// A reference could not be mapped to a containing function definition.
    #[error("No enclosing function for {path}:{line}")]
    NoEnclosingFunction { path: String, line: u32 },

    /// The index service could not be reached or rejected the request.
    #[error("Index unavailable at {endpoint}: {message}")]
    IndexUnavailable {
        endpoint: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The index answered with a body we could not interpret.
    #[error("Malformed index response: {message}")]
    MalformedResponse { message: String },

    /// Configuration file errors
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Invalid argument provided
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The build was aborted through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CallscopeError {
    /// Create a not-found error for a qualified name.
    pub fn not_found(qualname: impl Into<String>) -> Self {
        Self::NotFound {
            qualname: qualname.into(),
        }
    }

    /// Create a no-enclosing-function error for a source location.
    pub fn no_enclosing(path: impl Into<String>, line: u32) -> Self {
        Self::NoEnclosingFunction {
            path: path.into(),
            line,
        }
    }

    /// Create an index-unavailable error without an underlying cause.
    pub fn unavailable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IndexUnavailable {
            endpoint: endpoint.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an index-unavailable error wrapping a transport error.
    pub fn unavailable_from<E>(endpoint: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::IndexUnavailable {
            endpoint: endpoint.into(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error (the build can continue past it).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::NoEnclosingFunction { .. }
        )
    }

    /// Get the config path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Config { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience type alias for callscope results.
pub type CallscopeResult<T> = Result<T, CallscopeError>;
