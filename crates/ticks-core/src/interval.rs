//! Bar interval definitions.
//!
//! This module defines [`Interval`], the granularity of the bars a provider
//! aggregates for a historical request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TicksError;

/// Granularity of historical bars.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// One-minute bars.
    #[default]
    #[serde(rename = "1minute")]
    OneMinute,
    /// Five-minute bars.
    #[serde(rename = "5minute")]
    FiveMinute,
    /// Thirty-minute bars.
    #[serde(rename = "30minute")]
    ThirtyMinute,
    /// Daily bars.
    #[serde(rename = "1day")]
    OneDay,
}

impl Interval {
    /// All supported intervals, finest first.
    pub const ALL: [Self; 4] = [
        Self::OneMinute,
        Self::FiveMinute,
        Self::ThirtyMinute,
        Self::OneDay,
    ];

    /// Returns the wire code used by the provider (e.g. `"1minute"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1minute",
            Self::FiveMinute => "5minute",
            Self::ThirtyMinute => "30minute",
            Self::OneDay => "1day",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = TicksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TicksError::Validation(format!("unsupported interval: {s}")))
    }
}
