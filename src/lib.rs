//! Cleaning stage for the rental-listings data pipeline.
//!
//! # Overview
//!
//! This crate implements one stage of an ML data-preparation workflow. A run:
//!
//! 1. Resolves a versioned input artifact to a local snapshot CSV
//! 2. Drops rows whose `price` falls outside a caller-supplied inclusive range
//! 3. Normalizes the `last_review` text column to a calendar date
//! 4. Writes the cleaned snapshot and publishes it as a new artifact version
//!    with lineage back to its input
//! 5. Deletes the local scratch file once the store has ingested it
//!
//! The transform is deterministic: identical input bytes and parameters yield
//! an identical output table, including the date normalization, which uses a
//! fixed format ladder rather than inference.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use listing_cleaning::{CleaningConfig, CleaningStage, FsArtifactStore};
//!
//! let store = FsArtifactStore::open("artifact-store")?;
//! let config = CleaningConfig {
//!     input_artifact: "sample:latest".into(),
//!     output_artifact: "clean_sample.csv".into(),
//!     output_type: "clean_sample".into(),
//!     output_description: "Listings with price outliers removed".into(),
//!     min_price: 10.0,
//!     max_price: 350.0,
//! };
//!
//! let report = CleaningStage::new(store, config).run()?;
//! println!("Published {} ({} rows kept)", report.artifact, report.rows_kept);
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod stage;
pub mod store;
pub mod utils;

// Re-exports for convenient access
pub use config::{CleaningConfig, ConfigValidationError};
pub use error::{CleaningError, Result, ResultExt};
pub use stage::{CleanSummary, CleaningStage, StageReport, StageState};
pub use store::{ArtifactDraft, ArtifactId, ArtifactStore, FsArtifactStore};
