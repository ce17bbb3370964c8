//! Sequential job runner.

use std::path::PathBuf;

use ticks_core::{HistoricalDataFetcher, MarketDataProvider, Result};
use ticks_csv::write_csv;
use tracing::{error, info};

use crate::config::{FetchJob, RunConfig};

/// What a completed run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of bars written across all jobs.
    pub bars: usize,
    /// Files written, in job order.
    pub outputs: Vec<PathBuf>,
}

/// Authenticates once with `provider` and runs every job in `config`.
pub async fn run<P: MarketDataProvider>(provider: P, config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;

    let fetcher = HistoricalDataFetcher::new(provider);
    let session = fetcher.authenticate(&config.credentials).await?;
    run_jobs(&fetcher, &session, &config.jobs).await
}

/// Runs `jobs` one after another using an existing session.
///
/// Each job is fetched and then written. The first failure stops the run; the
/// failing job writes nothing and later jobs are not attempted.
pub async fn run_jobs<P: MarketDataProvider>(
    fetcher: &HistoricalDataFetcher<P>,
    session: &P::Session,
    jobs: &[FetchJob],
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    for job in jobs {
        let label = job.label();
        info!(job = %label, "Fetching");

        let result = match fetcher.fetch_history(session, &job.query).await {
            Ok(result) => result,
            Err(e) => {
                error!(job = %label, error = %e, "Fetch failed, aborting run");
                return Err(e);
            }
        };

        write_csv(&result, &job.output)?;
        info!(job = %label, bars = result.len(), output = %job.output.display(), "Job complete");

        summary.bars += result.len();
        summary.outputs.push(job.output.clone());
    }

    Ok(summary)
}
