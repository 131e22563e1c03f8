//! Configuration for the cleaning stage.
//!
//! One run is fully described by a [`CleaningConfig`] passed by reference into
//! the stage. There is no process-wide run handle; the config is serialized
//! onto the published artifact's manifest so every output version records the
//! parameters that produced it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for one cleaning run.
///
/// All fields are required; the CLI maps its arguments onto this struct
/// one-to-one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Reference to the source artifact (`name`, `name:latest`, or `name:vN`).
    pub input_artifact: String,

    /// Name for the cleaned output artifact. Also used as the local scratch
    /// file path between persist and cleanup.
    pub output_artifact: String,

    /// Type tag recorded on the new artifact version.
    pub output_type: String,

    /// Free-text description recorded on the new artifact version.
    pub output_description: String,

    /// Inclusive lower bound for the price filter.
    pub min_price: f64,

    /// Inclusive upper bound for the price filter.
    pub max_price: f64,
}

impl CleaningConfig {
    /// Validate the configuration.
    ///
    /// Only finiteness of the bounds is checked. `min_price <= max_price` is
    /// assumed, not validated; an inverted range filters out every row.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if !self.min_price.is_finite() {
            return Err(ConfigValidationError::NonFiniteBound {
                field: "min_price".to_string(),
                value: self.min_price,
            });
        }
        if !self.max_price.is_finite() {
            return Err(ConfigValidationError::NonFiniteBound {
                field: "max_price".to_string(),
                value: self.max_price,
            });
        }
        Ok(())
    }
}

/// Validation errors for [`CleaningConfig`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("{field} must be a finite number, got {value}")]
    NonFiniteBound { field: String, value: f64 },
}
