//! Error types for the cleaning stage.
//!
//! One `thiserror` hierarchy covers the whole run: resolution failures when
//! fetching the input artifact, schema failures on the snapshot, and publish
//! failures from the artifact store. None of these are retried inside the
//! stage; every error aborts the run.

use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for the cleaning stage.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// The input artifact reference could not be resolved to a local file.
    #[error("Failed to resolve artifact '{reference}': {reason}")]
    Resolution { reference: String, reason: String },

    /// A required column was not found in the snapshot.
    #[error("Column '{0}' not found in snapshot")]
    ColumnNotFound(String),

    /// A required column has the wrong data type.
    #[error("Column '{column}' has type {dtype}, expected {expected}")]
    ColumnType {
        column: String,
        dtype: String,
        expected: String,
    },

    /// The artifact store rejected or could not ingest the new version.
    /// The local output file is retained for inspection when this occurs.
    #[error("Failed to publish artifact '{name}': {reason}")]
    Publish { name: String, reason: String },

    /// Invalid stage configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error means the scratch output file was deliberately
    /// retained on disk for inspection.
    pub fn retains_scratch(&self) -> bool {
        match self {
            Self::Publish { .. } => true,
            Self::WithContext { source, .. } => source.retains_scratch(),
            _ => false,
        }
    }
}

/// Result type alias for cleaning-stage operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Io(e).with_context(context))
    }
}
