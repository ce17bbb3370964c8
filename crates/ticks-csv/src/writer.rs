//! CSV table writer.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use ticks_core::{QueryResult, Result, TicksError};
use tracing::{debug, info};

use crate::TIMESTAMP_FORMAT;

/// Writes `result` to `path` as a CSV table, replacing any existing file.
///
/// The table is first written to a hidden sibling file and then renamed over
/// `path`, so a failed write never leaves a truncated table behind. Missing
/// parent directories are created.
pub fn write_csv(result: &QueryResult, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut df = result.to_dataframe()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| output_error(parent, e))?;
    }

    let partial = partial_path(path)?;
    debug!(path = %partial.display(), rows = df.height(), "Writing CSV");

    if let Err(e) = write_frame(&mut df, &partial) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    fs::rename(&partial, path).map_err(|e| {
        let _ = fs::remove_file(&partial);
        output_error(path, e)
    })?;

    info!(path = %path.display(), rows = result.len(), "Wrote CSV");
    Ok(())
}

fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).map_err(|e| output_error(path, e))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_datetime_format(Some(TIMESTAMP_FORMAT.to_string()))
        .finish(df)
        .map_err(|e| output_error(path, e))?;

    file.sync_all().map_err(|e| output_error(path, e))
}

/// `dir/name.csv` becomes `dir/.name.csv.partial`.
fn partial_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| TicksError::Output(format!("{} is not a file path", path.display())))?;

    let mut partial = std::ffi::OsString::from(".");
    partial.push(name);
    partial.push(".partial");
    Ok(path.with_file_name(partial))
}

fn output_error(path: &Path, e: impl std::fmt::Display) -> TicksError {
    TicksError::Output(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::Value;
    use ticks_core::PriceBar;

    fn bar(minute: u32, close: f64) -> PriceBar {
        let ts = NaiveDate::from_ymd_opt(2022, 4, 19)
            .unwrap()
            .and_hms_opt(9, minute, 0)
            .unwrap();
        PriceBar::new(ts, 107.35, 112.9, 105.05, close, 884100.0)
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("out/Nifty put data.csv")).unwrap(),
            PathBuf::from("out/.Nifty put data.csv.partial")
        );
        assert!(partial_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cash.csv");
        let result = QueryResult::new(vec![bar(15, 110.25), bar(16, 109.8)], 200, Value::Null);

        write_csv(&result, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,open,high,low,close,volume"
        );
        let first = lines.next().unwrap();
        assert!(
            first.starts_with("2022-04-19T09:15:00,107.35,112.9,105.05,110.25,"),
            "{first}"
        );
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn test_sub_millisecond_timestamp_and_missing_volume() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fine.csv");
        let ts = NaiveDate::from_ymd_opt(2022, 4, 19)
            .unwrap()
            .and_hms_micro_opt(9, 15, 0, 123_456)
            .unwrap();
        let result = QueryResult::new(
            vec![PriceBar::new(ts, 1.0, 2.0, 0.5, 1.5, 0.0).without_volume()],
            200,
            Value::Null,
        );

        write_csv(&result, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with("2022-04-19T09:15:00.123456,"), "{row}");
        assert!(row.ends_with(','), "{row}");
    }

    #[test]
    fn test_open_interest_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("put.csv");
        let result = QueryResult::new(
            vec![bar(15, 110.25).with_open_interest(1254300.0)],
            200,
            Value::Null,
        );

        write_csv(&result, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "timestamp,open,high,low,close,volume,open_interest"
        );
    }

    #[test]
    fn test_overwrites_and_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.csv");

        let bars = vec![bar(15, 1.0), bar(16, 2.0), bar(17, 3.0)];
        let long = QueryResult::new(bars, 200, Value::Null);
        write_csv(&long, &path).unwrap();
        let short = QueryResult::new(vec![bar(18, 4.0)], 200, Value::Null);
        write_csv(&short, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("data.csv")]);
    }
}
