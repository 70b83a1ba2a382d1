//! Error types.
//!
//! - `PipelineError` is what the library returns: the parse/schema/value
//!   taxonomy of the core stages plus the I/O failures of the CSV layer.
//! - `AppError` is what the binary returns: a message plus a process exit code.
//!
//! Deliberate drops (gaps, misaligned buckets, un-interpolatable values) are
//! not errors and never show up here.

use thiserror::Error;

/// Errors raised by the alignment pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A timestamp (or other structured field) could not be parsed.
    #[error("parse error in `{field}`: invalid value '{value}' ({reason})")]
    Parse {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// An expected column, region, or series is missing or malformed.
    #[error("schema error: {0}")]
    Schema(String),

    /// A value that must be numeric is not.
    #[error("value error in `{column}`: '{value}' is not numeric")]
    Value { column: String, value: String },

    /// An argument outside its valid domain (e.g. a split fraction).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Whether the error was caused by bad input data (as opposed to the environment).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::Schema(_) | Self::Value { .. } | Self::InvalidArgument(_)
        )
    }
}

/// Error surfaced by the `gsp` binary.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        // 2 = bad input data / arguments, 4 = filesystem or encoding failure.
        let code = if err.is_input_error() { 2 } else { 4 };
        AppError::new(code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
