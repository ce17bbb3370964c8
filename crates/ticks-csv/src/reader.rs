//! CSV table reader.

use std::path::Path;

use chrono::NaiveDateTime;
use polars::prelude::*;
use ticks_core::{PriceBar, Result, TicksError};
use tracing::debug;

use crate::{COLUMNS, TIMESTAMP_FORMAT};

/// Reads a table written by [`write_csv`](crate::write_csv).
///
/// Every cell is read as text and parsed here, so values come back exactly as
/// they were written. The `open_interest` column is optional, and an empty
/// `volume` or `open_interest` cell reads back as `None`.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Vec<PriceBar>> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Reading CSV");

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| TicksError::Output(format!("{}: {e}", path.display())))?;

    let required = COLUMNS[..6]
        .iter()
        .map(|name| text_column(&df, name))
        .collect::<Result<Vec<_>>>()?;
    let open_interest = df
        .column("open_interest")
        .ok()
        .map(|c| cells(c, "open_interest"))
        .transpose()?;

    (0..df.height())
        .map(|row| {
            let cell = |col: usize| required[col].get(row).copied().flatten();

            let timestamp = required_cell(cell(0), "timestamp", row)?;
            let bar = PriceBar {
                timestamp: NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(
                    |e| TicksError::Parse(format!("row {row}: timestamp {timestamp:?}: {e}")),
                )?,
                open: number(required_cell(cell(1), "open", row)?, row)?,
                high: number(required_cell(cell(2), "high", row)?, row)?,
                low: number(required_cell(cell(3), "low", row)?, row)?,
                close: number(required_cell(cell(4), "close", row)?, row)?,
                volume: cell(5)
                    .filter(|s| !s.is_empty())
                    .map(|s| number(s, row))
                    .transpose()?,
                open_interest: open_interest
                    .as_ref()
                    .and_then(|oi| oi.get(row).copied().flatten())
                    .filter(|s| !s.is_empty())
                    .map(|s| number(s, row))
                    .transpose()?,
            };
            Ok(bar)
        })
        .collect()
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> Result<Vec<Option<&'a str>>> {
    let column = df
        .column(name)
        .map_err(|_| TicksError::Parse(format!("missing column {name}")))?;
    cells(column, name)
}

fn cells<'a>(column: &'a Column, name: &str) -> Result<Vec<Option<&'a str>>> {
    let values = column
        .as_materialized_series()
        .str()
        .map_err(|e| TicksError::Parse(format!("column {name}: {e}")))?;
    Ok(values.into_iter().collect())
}

fn required_cell<'a>(value: Option<&'a str>, name: &str, row: usize) -> Result<&'a str> {
    value
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TicksError::Parse(format!("row {row}: empty {name}")))
}

fn number(s: &str, row: usize) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| TicksError::Parse(format!("row {row}: not a number: {s:?}")))
}
