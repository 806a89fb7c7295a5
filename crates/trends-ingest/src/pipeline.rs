//! Run orchestration
//!
//! A run moves through a fixed sequence of stages:
//!
//! ```text
//! Idle -> Acquiring -> Cleaning -> Staging -> Loading -> Cleanup -> Done
//!            \            \           \
//!             +------------+-----------+--> Failed
//! ```
//!
//! Each stage takes the previous stage's output as an explicit value. Any
//! error before `Loading` ends the run in `Failed` and nothing later runs;
//! loading failures are isolated per family and only show up in the report.

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{error, info, warn};
use trends_common::{Result, TrendsError};

use crate::cleaning::clean_datasets;
use crate::config::{IngestConfig, PlaylistRef, PROVIDER_ARTIST_BATCH_LIMIT};
use crate::dataset::{Dataset, TrackedPlaylist};
use crate::loader::{FamilyLoadOutcome, LoadScope, Loader};
use crate::resolver::ArtistResolver;
use crate::sources::spotify::{CatalogueConnector, SpotifyClient};
use crate::sources::{BillboardChart, ChartSource, DjMagRanking};
use crate::staging::{StagedFile, StagingWriter};
use crate::store::Store;

/// Format of staged file name timestamps
pub const COMPACT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Format of the `source_date` column
pub const SOURCE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-run context, captured once when the run starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    run_timestamp: DateTime<Utc>,
}

impl RunContext {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(run_timestamp: DateTime<Utc>) -> Self {
        Self { run_timestamp }
    }

    pub fn run_timestamp(&self) -> DateTime<Utc> {
        self.run_timestamp
    }

    /// `YYYYMMDDHHMMSS`, used in staged file names
    pub fn compact(&self) -> String {
        self.run_timestamp.format(COMPACT_TIMESTAMP_FORMAT).to_string()
    }

    /// `YYYY-MM-DD HH:MM:SS`, stamped into `source_date`
    pub fn stamp(&self) -> String {
        self.run_timestamp.format(SOURCE_DATE_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    Acquiring,
    Cleaning,
    Staging,
    Loading,
    Cleanup,
    Done,
    Failed,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Idle => "idle",
            RunStage::Acquiring => "acquiring",
            RunStage::Cleaning => "cleaning",
            RunStage::Staging => "staging",
            RunStage::Loading => "loading",
            RunStage::Cleanup => "cleanup",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a run ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    /// Stage that was running when the error surfaced
    pub stage: RunStage,
    /// Error class (`source_unavailable`, `authentication_failed`, ...)
    pub kind: &'static str,
    pub message: String,
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Compact run timestamp shared by every staged file
    pub run_timestamp: String,
    /// Last stage reached (`Done` or `Failed` once the run is over)
    pub stage: RunStage,
    pub failure: Option<RunFailure>,
    pub staged: Vec<StagedFile>,
    pub loads: Vec<FamilyLoadOutcome>,
}

impl RunReport {
    fn new(ctx: &RunContext) -> Self {
        Self {
            run_timestamp: ctx.compact(),
            stage: RunStage::Idle,
            failure: None,
            staged: Vec::new(),
            loads: Vec::new(),
        }
    }

    fn enter(&mut self, stage: RunStage) {
        info!(run = %self.run_timestamp, from = %self.stage, to = %stage, "Run stage transition");
        self.stage = stage;
    }

    fn fail(mut self, err: TrendsError) -> Self {
        error!(
            run = %self.run_timestamp,
            stage = %self.stage,
            kind = err.kind(),
            "Run failed: {}",
            err
        );
        self.failure = Some(RunFailure {
            stage: self.stage,
            kind: err.kind(),
            message: err.to_string(),
        });
        self.stage = RunStage::Failed;
        self
    }

    /// Run finished and every family loaded or was skipped
    pub fn is_success(&self) -> bool {
        self.stage == RunStage::Done && !self.loads.iter().any(FamilyLoadOutcome::is_failed)
    }

    pub fn failed_families(&self) -> impl Iterator<Item = &FamilyLoadOutcome> {
        self.loads.iter().filter(|outcome| outcome.is_failed())
    }

    fn log_summary(&self) {
        info!(
            run = %self.run_timestamp,
            stage = %self.stage,
            staged_files = self.staged.len(),
            "Run finished"
        );
        for outcome in &self.loads {
            if outcome.is_failed() {
                warn!("  {}", outcome);
            } else {
                info!("  {}", outcome);
            }
        }
    }
}

/// The ingestion pipeline
pub struct Pipeline {
    charts: Vec<Box<dyn ChartSource>>,
    catalogue: Box<dyn CatalogueConnector>,
    playlists: Vec<PlaylistRef>,
    store: Store,
    staging: StagingWriter,
    artist_batch_size: usize,
    artist_fetch_concurrency: usize,
}

impl Pipeline {
    pub fn new(
        charts: Vec<Box<dyn ChartSource>>,
        catalogue: Box<dyn CatalogueConnector>,
        store: Store,
        staging: StagingWriter,
    ) -> Self {
        Self {
            charts,
            catalogue,
            playlists: Vec::new(),
            store,
            staging,
            artist_batch_size: PROVIDER_ARTIST_BATCH_LIMIT,
            artist_fetch_concurrency: 1,
        }
    }

    /// Wire the production adapters from configuration
    pub async fn from_config(config: &IngestConfig) -> Result<Self> {
        config.validate_for_run()?;

        let charts: Vec<Box<dyn ChartSource>> = vec![
            Box::new(BillboardChart::new(&config.charts)?),
            Box::new(DjMagRanking::new(&config.charts)?),
        ];
        let catalogue = SpotifyClient::new(config.catalogue.clone())?;
        let store = Store::connect(&config.store).await?;

        Ok(Self::new(charts, Box::new(catalogue), store, StagingWriter::new(&config.staging.dir))
            .with_playlists(config.catalogue.playlists.clone())
            .with_artist_batching(
                config.catalogue.artist_batch_size,
                config.catalogue.artist_fetch_concurrency,
            ))
    }

    pub fn with_playlists(mut self, playlists: Vec<PlaylistRef>) -> Self {
        self.playlists = playlists;
        self
    }

    pub fn with_artist_batching(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.artist_batch_size = batch_size;
        self.artist_fetch_concurrency = concurrency;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn staging(&self) -> &StagingWriter {
        &self.staging
    }

    /// Run once with the current time as run timestamp
    pub async fn run(&self) -> RunReport {
        self.run_at(RunContext::now()).await
    }

    /// Run once with an explicit context
    pub async fn run_at(&self, ctx: RunContext) -> RunReport {
        let mut report = RunReport::new(&ctx);
        info!(run = %report.run_timestamp, "Starting ingestion run");

        report.enter(RunStage::Acquiring);
        let datasets = match self.acquire().await {
            Ok(datasets) => datasets,
            Err(e) => return report.fail(e),
        };

        report.enter(RunStage::Cleaning);
        let datasets = clean_datasets(datasets, &ctx);

        report.enter(RunStage::Staging);
        let staged = match self.staging.stage_all(&datasets, &ctx) {
            Ok(staged) => staged,
            Err(e) => return report.fail(e),
        };
        report.staged = staged;

        report.enter(RunStage::Loading);
        let loader = Loader::new(&self.store, self.staging.clone());
        report.loads = loader.load_all(&LoadScope::Run(ctx.compact())).await;

        report.enter(RunStage::Cleanup);
        drop(datasets);

        report.enter(RunStage::Done);
        report.log_summary();
        report
    }

    /// Close the store connections
    pub async fn shutdown(self) {
        self.store.pool().close().await;
    }

    /// Charts, then catalogue playlists, then new artists
    async fn acquire(&self) -> Result<Vec<Dataset>> {
        let mut datasets = Vec::new();

        for (idx, chart) in self.charts.iter().enumerate() {
            info!("Step {}/{}: fetching {} chart", idx + 1, self.charts.len(), chart.family());
            let entries = chart.fetch_ranked_list().await?;
            datasets.push(Dataset::from_chart(chart.family(), chart.detail(), &entries));
        }

        let catalogue = self.catalogue.connect().await?;

        let mut tracks = Vec::new();
        let mut tracked = Vec::with_capacity(self.playlists.len());
        for playlist in &self.playlists {
            info!("Fetching playlist {} ({})", playlist.name, playlist.id);
            let playlist_tracks = catalogue.fetch_playlist(&playlist.id).await?;

            tracked.push(TrackedPlaylist {
                name: playlist.name.clone(),
                playlist_id: playlist.id.clone(),
                track_count: playlist_tracks.len(),
            });
            datasets.push(Dataset::from_tracks(&playlist.name, &playlist_tracks));
            tracks.extend(playlist_tracks);
        }
        datasets.push(Dataset::from_playlists(&tracked));

        // the first run sees an empty store, not a missing table
        self.store.ensure_schema().await?;

        let artists = ArtistResolver::new(&self.store, catalogue.as_ref())
            .with_batch_size(self.artist_batch_size)
            .with_concurrency(self.artist_fetch_concurrency)
            .resolve(&tracks)
            .await?;
        info!("Resolved {} new artists", artists.len());
        datasets.push(Dataset::from_artists(&artists));

        Ok(datasets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_context_formats() {
        let ctx = RunContext::at(Utc.with_ymd_and_hms(2021, 12, 31, 23, 5, 1).unwrap());
        assert_eq!(ctx.compact(), "20211231230501");
        assert_eq!(ctx.stamp(), "2021-12-31 23:05:01");
    }

    #[test]
    fn test_failed_report_keeps_stage() {
        let ctx = RunContext::at(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        let mut report = RunReport::new(&ctx);
        report.enter(RunStage::Acquiring);

        let report = report.fail(TrendsError::authentication_failed("HTTP 400"));
        assert_eq!(report.stage, RunStage::Failed);
        assert!(!report.is_success());

        let failure = report.failure.unwrap();
        assert_eq!(failure.stage, RunStage::Acquiring);
        assert_eq!(failure.kind, "authentication_failed");
    }

    #[test]
    fn test_failed_family_fails_report() {
        use crate::family::Family;
        use crate::loader::LoadStatus;

        let ctx = RunContext::at(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        let mut report = RunReport::new(&ctx);
        report.stage = RunStage::Done;
        report.loads = vec![
            FamilyLoadOutcome { family: Family::Billboard, status: LoadStatus::Skipped },
            FamilyLoadOutcome { family: Family::Artists, status: LoadStatus::Failed("boom".to_string()) },
        ];

        assert!(!report.is_success());
        assert_eq!(report.failed_families().count(), 1);
    }
}
