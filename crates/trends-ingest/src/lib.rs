//! Music Trends Ingest Library
//!
//! Pulls ranked charts and catalogue data from external providers, stages
//! them as CSV files and appends them to a relational store.
//!
//! # Sources
//!
//! - **Billboard**: Hot 100 chart page
//! - **DJ Mag**: Top 100 DJs ranking page
//! - **Spotify**: playlist tracks and artist metadata (Web API)
//!
//! # Example
//!
//! ```no_run
//! use trends_ingest::{IngestConfig, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let pipeline = Pipeline::from_config(&config).await?;
//!     let report = pipeline.run().await;
//!     println!("run {} ended in {}", report.run_timestamp, report.stage);
//!     Ok(())
//! }
//! ```

pub mod cleaning;
pub mod config;
pub mod dataset;
pub mod family;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod sources;
pub mod staging;
pub mod store;

pub use config::IngestConfig;
pub use dataset::Dataset;
pub use family::Family;
pub use loader::{FamilyLoadOutcome, LoadScope, LoadStatus, Loader};
pub use pipeline::{Pipeline, RunContext, RunReport, RunStage};
pub use staging::{StagedFile, StagingWriter};
pub use store::Store;
