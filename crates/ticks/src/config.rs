//! Run configuration.
//!
//! A run is described by a JSON file holding the provider credentials and the
//! list of fetch jobs:
//!
//! ```json
//! {
//!   "credentials": { "api_key": "...", "api_secret": "...", "session_token": "..." },
//!   "jobs": [
//!     {
//!       "name": "nifty index",
//!       "query": {
//!         "symbol": "NIFTY", "exchange": "NSE", "product_type": "cash",
//!         "interval": "1minute",
//!         "from": "2022-04-19T07:00:00.000Z", "to": "2022-04-19T18:00:00.000Z"
//!       },
//!       "output": "Nifty index data.csv"
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use ticks_core::{InstrumentQuery, Result, SessionCredentials, TicksError};
use tracing::debug;

/// Everything a run needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Provider credentials.
    pub credentials: SessionCredentials,
    /// Alternative provider API root.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Jobs, executed in order.
    pub jobs: Vec<FetchJob>,
}

/// One query and where to write its result.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchJob {
    /// Label used in logs.
    #[serde(default)]
    pub name: Option<String>,
    /// What to fetch.
    pub query: InstrumentQuery,
    /// Target CSV file.
    pub output: PathBuf,
}

impl FetchJob {
    /// Label used in logs: the name, or the output path.
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.output.display().to_string())
    }
}

impl RunConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading run configuration");

        let text = fs::read_to_string(path)
            .map_err(|e| TicksError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Parses and validates a configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| TicksError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every job up front so a bad job cannot abort a run half way.
    ///
    /// Requires at least one job, valid queries and distinct outputs.
    pub fn validate(&self) -> Result<()> {
        if self.jobs.is_empty() {
            return Err(TicksError::Config("no jobs configured".to_string()));
        }

        let mut outputs = HashSet::new();
        for job in &self.jobs {
            job.query.contract().map_err(|e| match e {
                TicksError::Validation(msg) => {
                    TicksError::Validation(format!("job {}: {msg}", job.label()))
                }
                other => other,
            })?;

            if !outputs.insert(normalize(&job.output)) {
                return Err(TicksError::Config(format!(
                    "output {} is used by more than one job",
                    job.output.display()
                )));
            }
        }

        Ok(())
    }
}

/// Drops `.` components so `a.csv` and `./a.csv` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
