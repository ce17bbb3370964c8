#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ticks/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! CSV output tables for query results.
//!
//! - [`write_csv`] - Writes a [`QueryResult`](ticks_core::QueryResult) to disk
//! - [`read_csv`] - Reads a table back into [`PriceBar`](ticks_core::PriceBar)s

/// Reading tables back.
pub mod reader;
/// Writing tables.
pub mod writer;

pub use reader::read_csv;
pub use writer::write_csv;

/// Column names, in output order.
pub const COLUMNS: [&str; 7] = [
    "timestamp",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "open_interest",
];

/// Format of the timestamp column.
///
/// Fractional seconds are written with as many digits as they need (none,
/// 3, 6 or 9), so nanosecond timestamps survive a round trip.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
