#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ticks/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Historical bar fetching for index, futures and options contracts.
//!
//! # Features
//!
//! - `breeze` - ICICI Breeze provider (enabled by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use ticks::{BreezeProvider, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> ticks::Result<()> {
//!     let config = RunConfig::load("demos/nifty.json")?;
//!     let summary = ticks::run(BreezeProvider::new(), &config).await?;
//!     println!("wrote {} bars", summary.bars);
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use ticks_core::*;

// Output
pub use ticks_csv::{read_csv, write_csv};

// Providers
#[cfg(feature = "breeze")]
pub use ticks_breeze::{BreezeProvider, BreezeSession};

pub mod config;
pub mod logging;
pub mod runner;

pub use config::{FetchJob, RunConfig};
pub use logging::init_logging;
pub use runner::{RunSummary, run, run_jobs};
