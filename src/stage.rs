//! The cleaning stage runner.
//!
//! One run moves through a fixed sequence of states:
//!
//! `Start → Resolved → Loaded → Filtered → Converted → Persisted → Published → Cleaned`
//!
//! Any failure before `Published` aborts the run and leaves the local output
//! file (if it was written) in place for inspection; the scratch file is only
//! deleted after the store has confirmed ingestion.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cleaner;
use crate::config::CleaningConfig;
use crate::error::Result;
use crate::store::{ArtifactDraft, ArtifactId, ArtifactStore};

/// States of one cleaning run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Run accepted, nothing resolved yet
    Start,
    /// Input reference resolved to a local file
    Resolved,
    /// Snapshot parsed into memory
    Loaded,
    /// Price outliers dropped
    Filtered,
    /// Review dates normalized
    Converted,
    /// Cleaned snapshot written to the scratch file
    Persisted,
    /// New artifact version ingested by the store
    Published,
    /// Scratch file removed; terminal
    Cleaned,
}

impl StageState {
    /// Returns a human-readable name for the state.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Resolved => "Resolved",
            Self::Loaded => "Loaded",
            Self::Filtered => "Filtered",
            Self::Converted => "Converted",
            Self::Persisted => "Persisted",
            Self::Published => "Published",
            Self::Cleaned => "Cleaned",
        }
    }
}

/// Row and date counters from the transform half of a run.
#[derive(Debug, Clone, Serialize)]
pub struct CleanSummary {
    pub rows_before: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub unparseable_dates: usize,
}

/// Everything an operator needs to audit one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub rows_before: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub unparseable_dates: usize,
    pub output_path: PathBuf,
    pub artifact: ArtifactId,
    pub duration_ms: u64,
}

/// The cleaning stage: owns the store handle and one run's configuration.
pub struct CleaningStage<S: ArtifactStore> {
    store: S,
    config: CleaningConfig,
}

// The stage may be moved onto a worker thread by embedders.
static_assertions::assert_impl_all!(CleaningStage<crate::store::FsArtifactStore>: Send);

impl<S: ArtifactStore> CleaningStage<S> {
    pub fn new(store: S, config: CleaningConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Resolve, load, filter, convert, and persist the snapshot.
    ///
    /// Returns the scratch file path (the configured `output_artifact`) and
    /// the transform counters. The file is left on disk; callers publish and
    /// then delete it.
    pub fn clean(&self) -> Result<(PathBuf, CleanSummary)> {
        info!(
            "Downloading artifact (reference={})",
            self.config.input_artifact
        );
        let input_path = self.store.resolve(&self.config.input_artifact)?;
        self.advance(StageState::Resolved);

        info!("Reading artifact as *.csv (path={})", input_path.display());
        let df = cleaner::read_snapshot(&input_path)?;
        let rows_before = df.height();
        self.advance(StageState::Loaded);

        info!(
            "Dropping outliers (column=price;range=({},{}))",
            self.config.min_price, self.config.max_price
        );
        let df = cleaner::filter_price_range(&df, self.config.min_price, self.config.max_price)?;
        let rows_kept = df.height();
        info!("Dropped {} of {} rows", rows_before - rows_kept, rows_before);
        self.advance(StageState::Filtered);

        info!("Converting columns (column=last_review;transform=to_date)");
        let (mut df, unparseable_dates) = cleaner::normalize_review_dates(df)?;
        self.advance(StageState::Converted);

        let output_path = PathBuf::from(&self.config.output_artifact);
        info!("Saving output file (file={})", output_path.display());
        cleaner::write_snapshot(&mut df, &output_path)?;
        self.advance(StageState::Persisted);

        Ok((
            output_path,
            CleanSummary {
                rows_before,
                rows_kept,
                rows_dropped: rows_before - rows_kept,
                unparseable_dates,
            },
        ))
    }

    /// Register the cleaned file as a new artifact version.
    ///
    /// The draft records the input reference as lineage and the full run
    /// configuration. On failure the scratch file is left in place.
    pub fn publish(&self, output_path: &Path) -> Result<ArtifactId> {
        let draft = ArtifactDraft::new(
            self.config.output_artifact.as_str(),
            self.config.output_type.as_str(),
            self.config.output_description.as_str(),
        )
        .with_file(output_path)
        .with_input(self.config.input_artifact.as_str())
        .with_run_config(serde_json::to_value(&self.config)?);

        info!("Logging artifact (name={})", self.config.output_artifact);
        self.store.log_artifact(&draft)
    }

    /// Best-effort idempotent delete of the scratch file.
    ///
    /// A missing file is not an error; other filesystem errors are logged and
    /// swallowed so a successful publish is never turned into a failed run.
    pub fn cleanup(output_path: &Path) {
        match std::fs::remove_file(output_path) {
            Ok(()) => info!("Cleaning up (file={})", output_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not remove scratch file {}: {}",
                output_path.display(),
                e
            ),
        }
    }

    /// Run the whole stage through its state machine.
    pub fn run(&self) -> Result<StageReport> {
        self.config.validate()?;
        let started = Instant::now();
        self.advance(StageState::Start);

        let (output_path, summary) = self.clean()?;
        let artifact = self.publish(&output_path)?;
        self.advance(StageState::Published);

        Self::cleanup(&output_path);
        self.advance(StageState::Cleaned);

        info!(
            "Run complete ({} -> {} rows, artifact={})",
            summary.rows_before, summary.rows_kept, artifact
        );

        Ok(StageReport {
            rows_before: summary.rows_before,
            rows_kept: summary.rows_kept,
            rows_dropped: summary.rows_dropped,
            unparseable_dates: summary.unparseable_dates,
            output_path,
            artifact,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn advance(&self, state: StageState) {
        debug!("Run state: {}", state.display_name());
    }
}
