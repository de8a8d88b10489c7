//! Error types for streamconv
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Errors are grouped into classes (see [`ErrorClass`]) that decide how far
//! they unwind: record-level errors are recovered inside the streaming loop,
//! everything else terminates the current job.

use thiserror::Error;

/// The main error type for streamconv
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Record-level Errors
    // ============================================================================
    #[error("Failed to decode record at {line_or_index}: {message}")]
    Decode {
        /// 1-based line number (NDJSON) or 0-based element index (JSON array)
        line_or_index: usize,
        raw_token: String,
        message: String,
    },

    #[error("Value '{value}' does not fit DECIMAL({precision}, {scale}) without losing digits")]
    PrecisionLoss {
        value: String,
        precision: u8,
        scale: i8,
    },

    // ============================================================================
    // Container Errors
    // ============================================================================
    #[error("Malformed JSON array at element {index}: {message}")]
    MalformedContainer { index: usize, message: String },

    // ============================================================================
    // Resource Errors
    // ============================================================================
    #[error("Cannot open '{path}': {message}")]
    Resource { path: String, message: String },

    // ============================================================================
    // Schema Errors
    // ============================================================================
    #[error("Field '{field}' is not part of the frozen header")]
    SchemaAnomaly { field: String },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // Format Errors
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("Columnar engine error: {0}")]
    Engine(#[from] duckdb::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// How an error propagates through a conversion job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// One record or line is unusable; skip it and keep streaming
    Record,
    /// The container document is broken; the job stops
    Container,
    /// Input or output could not be opened; the job never starts
    Resource,
    /// Header/record mismatch; reported, never fatal
    Schema,
    /// Invalid job configuration; the job never starts
    Configuration,
    /// Anything else; the job aborts
    Unexpected,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a decode error for one line or array element
    pub fn decode(
        line_or_index: usize,
        raw_token: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Decode {
            line_or_index,
            raw_token: raw_token.into(),
            message: message.into(),
        }
    }

    /// Create a malformed container error
    pub fn malformed(index: usize, message: impl Into<String>) -> Self {
        Self::MalformedContainer {
            index,
            message: message.into(),
        }
    }

    /// Create a resource error for a path
    pub fn resource(path: impl AsRef<std::path::Path>, message: impl ToString) -> Self {
        Self::Resource {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }

    /// Classify this error for propagation
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Decode { .. } | Error::PrecisionLoss { .. } => ErrorClass::Record,
            Error::MalformedContainer { .. } => ErrorClass::Container,
            Error::Resource { .. } => ErrorClass::Resource,
            Error::SchemaAnomaly { .. } => ErrorClass::Schema,
            Error::Config { .. } | Error::InvalidConfigValue { .. } | Error::YamlParse(_) => {
                ErrorClass::Configuration
            }
            _ => ErrorClass::Unexpected,
        }
    }

    /// Check if streaming can continue past this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self.class(), ErrorClass::Record | ErrorClass::Schema)
    }
}

/// Result type alias for streamconv
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
