#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ticks/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for fetching historical market data.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`MarketDataProvider`](session::MarketDataProvider) - Opens sessions
//! - [`MarketDataSession`](session::MarketDataSession) - One round trip per request
//! - [`InstrumentQuery`](types::InstrumentQuery) - What to fetch
//! - [`HistoricalDataFetcher`](fetcher::HistoricalDataFetcher) - Validate, fetch, map
//! - [`StubProvider`](stub::StubProvider) - Canned answers for tests

/// Price bars and query results.
pub mod bar;
/// Error types for fetch operations.
pub mod error;
/// The historical data fetcher.
pub mod fetcher;
/// Bar interval definitions.
pub mod interval;
/// Provider and session traits.
pub mod session;
/// Stub provider for tests.
pub mod stub;
/// Instrument and request types.
pub mod types;

// Re-export commonly used items at crate root
pub use bar::{PriceBar, QueryResult};
pub use error::{Result, TicksError};
pub use fetcher::{HistoricalDataFetcher, fetch_history};
pub use interval::Interval;
pub use session::{MarketDataProvider, MarketDataSession, ProviderPayload, SessionCredentials};
pub use stub::{StubProvider, StubSession};
pub use types::{
    Contract, Exchange, HistoricalRequest, InstrumentQuery, OptionRight, ProductType, Symbol,
    to_wire_timestamp,
};
