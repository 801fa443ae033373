//! Error types for the playground core
//!
//! One enum per concern:
//! - Remote service failures (`ApiError`)
//! - Local analysis failures (`AnalyzerError`)
//! - Settings persistence failures (`ConfigError`)
//! - Local file import/export failures (`FileError`)
//! - Dispatcher failures that end up in application state (`DispatchError`)

use std::path::PathBuf;

/// Normalized remote service error
///
/// Displays as the server-supplied `error` message when the response carried
/// one, otherwise as the transport-level message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    status: Option<u16>,
}

impl ApiError {
    /// Transport-level failure (connect, timeout, decode)
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Non-success response with the given HTTP status
    #[inline]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Error message shown to the user
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code, if the server answered
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }
}

/// Local analyzer errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyzerError {
    /// Engine failed to start
    #[error("failed to instantiate analyzer: {0}")]
    Instantiate(String),

    /// A single analysis pass failed
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// Analyzer was used after `dispose`
    #[error("analyzer has been disposed")]
    Disposed,
}

/// Settings persistence errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the settings file failed
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Settings could not be serialized
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No platform configuration directory
    #[error("no configuration directory available")]
    NoConfigDir,
}

/// Local file import/export errors
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// File could not be read as UTF-8 text
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File could not be written
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path has no usable file name
    #[error("invalid file name: {0}")]
    InvalidName(String),
}

impl FileError {
    /// Create read error for path
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create write error for path
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Failures of a loading-gated dispatcher
///
/// Every variant is rendered into the single `Error` state transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Remote call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configured runtime kind is not known
    #[error("unknown runtime type \"{0}\"")]
    UnknownRuntime(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_bare_message() {
        let err = ApiError::status(500, "compile failed");
        assert_eq!(err.to_string(), "compile failed");
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(ApiError::transport("connection refused").status_code(), None);
    }

    #[test]
    fn dispatch_error_is_transparent_for_api() {
        let err = DispatchError::from(ApiError::transport("timed out"));
        assert_eq!(err.to_string(), "timed out");
    }

    #[test]
    fn unknown_runtime_message() {
        let err = DispatchError::UnknownRuntime("WASM".to_string());
        assert_eq!(err.to_string(), "unknown runtime type \"WASM\"");
    }
}
