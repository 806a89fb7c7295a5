//! Music Trends Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the music trends workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the pipeline error taxonomy and result alias
//! - **Logging**: `tracing` subscriber configuration and initialization
//!
//! # Example
//!
//! ```no_run
//! use trends_common::{Result, TrendsError};
//!
//! fn require_token(token: &str) -> Result<()> {
//!     if token.is_empty() {
//!         return Err(TrendsError::authentication_failed("empty access token"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, TrendsError};
