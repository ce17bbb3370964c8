//! Price bars and query results.
//!
//! - [`PriceBar`] - One OHLCV row as reported by the provider
//! - [`QueryResult`] - Ordered bars plus the raw provider payload

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, TicksError};

/// One OHLCV bar.
///
/// `timestamp` is the exchange-local wall-clock time exactly as the provider
/// reported it. Prices and quantities are passed through unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Start of the bar interval.
    pub timestamp: NaiveDateTime,
    /// Opening price.
    pub open: f64,
    /// Highest price during the interval.
    pub high: f64,
    /// Lowest price during the interval.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume, if the provider reported one.
    pub volume: Option<f64>,
    /// Open interest (futures and options only).
    pub open_interest: Option<f64>,
}

impl PriceBar {
    /// Creates a new bar with a volume and without open interest.
    #[must_use]
    pub const fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: Some(volume),
            open_interest: None,
        }
    }

    /// Clears the volume.
    #[must_use]
    pub const fn without_volume(mut self) -> Self {
        self.volume = None;
        self
    }

    /// Sets the open interest.
    #[must_use]
    pub const fn with_open_interest(mut self, open_interest: f64) -> Self {
        self.open_interest = Some(open_interest);
        self
    }

    /// Builds a bar from one provider record.
    ///
    /// Numeric fields may arrive either as JSON numbers or as numeric strings.
    /// A missing or blank volume or open interest stays `None`.
    pub fn from_record(record: &Value) -> Result<Self> {
        let raw = RawBar::deserialize(record)
            .map_err(|e| TicksError::Parse(format!("{e}: {record}")))?;

        Ok(Self {
            timestamp: parse_provider_timestamp(&raw.datetime)?,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            open_interest: raw.open_interest,
        })
    }
}

/// Parses a provider timestamp.
///
/// Accepts `2022-04-19 09:15:00`, `2022-04-19T09:15:00.000Z` (optionally with
/// fractional seconds) and bare dates, which map to midnight.
pub fn parse_provider_timestamp(s: &str) -> Result<NaiveDateTime> {
    let trimmed = s.trim().trim_end_matches('Z');

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(ts);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TicksError::Parse(format!("unrecognised timestamp: {s}")))
}

/// Provider record layout.
#[derive(Debug, Deserialize)]
struct RawBar {
    datetime: String,
    #[serde(deserialize_with = "number")]
    open: f64,
    #[serde(deserialize_with = "number")]
    high: f64,
    #[serde(deserialize_with = "number")]
    low: f64,
    #[serde(deserialize_with = "number")]
    close: f64,
    #[serde(default, deserialize_with = "optional_number")]
    volume: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    open_interest: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

fn optional_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("not a number: {s:?}"))),
    }
}

fn number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    optional_number(deserializer)?.ok_or_else(|| D::Error::custom("missing number"))
}

/// Ordered bars returned by one successful provider round trip.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    bars: Vec<PriceBar>,
    status: u16,
    raw: Value,
}

impl QueryResult {
    /// Creates a result from already mapped bars.
    #[must_use]
    pub const fn new(bars: Vec<PriceBar>, status: u16, raw: Value) -> Self {
        Self { bars, status, raw }
    }

    /// Returns the bars in provider order.
    #[must_use]
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    /// Returns the status code the provider reported.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns the raw provider payload.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    /// Returns the number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Returns true if there are no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Returns true if any bar carries open interest.
    #[must_use]
    pub fn has_open_interest(&self) -> bool {
        self.bars.iter().any(|b| b.open_interest.is_some())
    }

    /// Returns an iterator over the bars.
    pub fn iter(&self) -> impl Iterator<Item = &PriceBar> {
        self.bars.iter()
    }

    /// Consumes the result and returns the bars.
    #[must_use]
    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }

    /// Converts the bars into a DataFrame.
    ///
    /// Columns: timestamp (nanosecond datetime), open, high, low, close,
    /// volume (null where missing) and, when any bar has it, open_interest.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let timestamps = self
            .bars
            .iter()
            .map(|b| {
                b.timestamp.and_utc().timestamp_nanos_opt().ok_or_else(|| {
                    TicksError::Output(format!("timestamp {} out of range", b.timestamp))
                })
            })
            .collect::<Result<Vec<i64>>>()?;

        let timestamp_col = Column::new("timestamp".into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Nanoseconds, None))
            .map_err(|e| TicksError::Output(e.to_string()))?;

        let mut columns = vec![
            timestamp_col,
            Column::new("open".into(), self.column(|b| b.open)),
            Column::new("high".into(), self.column(|b| b.high)),
            Column::new("low".into(), self.column(|b| b.low)),
            Column::new("close".into(), self.column(|b| b.close)),
            Column::new("volume".into(), self.optional_column(|b| b.volume)),
        ];

        if self.has_open_interest() {
            columns.push(Column::new(
                "open_interest".into(),
                self.optional_column(|b| b.open_interest),
            ));
        }

        DataFrame::new(columns).map_err(|e| TicksError::Output(e.to_string()))
    }

    fn column(&self, field: impl Fn(&PriceBar) -> f64) -> Vec<f64> {
        self.bars.iter().map(field).collect()
    }

    fn optional_column(&self, field: impl Fn(&PriceBar) -> Option<f64>) -> Vec<Option<f64>> {
        self.bars.iter().map(field).collect()
    }
}

impl IntoIterator for QueryResult {
    type Item = PriceBar;
    type IntoIter = std::vec::IntoIter<PriceBar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_with_string_numbers() {
        let record = json!({
            "close": "110.25",
            "datetime": "2022-04-19 09:15:00",
            "exchange_code": "NFO",
            "high": "112.9",
            "low": "105.05",
            "open": "107.35",
            "open_interest": "1254300",
            "right": "Put",
            "stock_code": "NIFTY",
            "strike_price": "17000",
            "volume": "884100"
        });

        let bar = PriceBar::from_record(&record).unwrap();
        assert_eq!(
            bar.timestamp,
            NaiveDate::from_ymd_opt(2022, 4, 19)
                .unwrap()
                .and_hms_opt(9, 15, 0)
                .unwrap()
        );
        assert_eq!(bar.open, 107.35);
        assert_eq!(bar.high, 112.9);
        assert_eq!(bar.low, 105.05);
        assert_eq!(bar.close, 110.25);
        assert_eq!(bar.volume, Some(884100.0));
        assert_eq!(bar.open_interest, Some(1254300.0));
    }

    #[test]
    fn test_record_with_json_numbers() {
        let record = json!({
            "datetime": "2022-04-19 09:16:00",
            "open": 17120.3,
            "high": 17131.85,
            "low": 17101.0,
            "close": 17110.45,
            "volume": 0
        });

        let bar = PriceBar::from_record(&record).unwrap();
        assert_eq!(bar.close, 17110.45);
        assert_eq!(bar.volume, Some(0.0));
        assert_eq!(bar.open_interest, None);
    }

    #[test]
    fn test_record_empty_open_interest() {
        let record = json!({
            "datetime": "2022-04-19 09:16:00",
            "open": "1", "high": "2", "low": "0.5", "close": "1.5",
            "volume": "", "open_interest": ""
        });

        let bar = PriceBar::from_record(&record).unwrap();
        assert_eq!(bar.volume, None);
        assert_eq!(bar.open_interest, None);
    }

    #[test]
    fn test_record_without_volume_is_not_zero() {
        let record = json!({
            "datetime": "2022-04-19 09:16:00",
            "open": "1", "high": "2", "low": "0.5", "close": "1.5"
        });

        let bar = PriceBar::from_record(&record).unwrap();
        assert_eq!(bar.volume, None);
    }

    #[test]
    fn test_record_keeps_sub_millisecond_time() {
        let record = json!({
            "datetime": "2022-04-19 09:15:00.123456",
            "open": "1", "high": "2", "low": "0.5", "close": "1.5", "volume": "10"
        });

        let bar = PriceBar::from_record(&record).unwrap();
        assert_eq!(
            bar.timestamp,
            NaiveDate::from_ymd_opt(2022, 4, 19)
                .unwrap()
                .and_hms_micro_opt(9, 15, 0, 123_456)
                .unwrap()
        );
    }

    #[test]
    fn test_record_missing_price() {
        let record = json!({"datetime": "2022-04-19 09:16:00", "open": "1"});
        assert!(matches!(
            PriceBar::from_record(&record),
            Err(TicksError::Parse(_))
        ));
    }

    #[test]
    fn test_record_bad_number() {
        let record = json!({
            "datetime": "2022-04-19 09:16:00",
            "open": "abc", "high": "2", "low": "0.5", "close": "1.5"
        });
        assert!(matches!(
            PriceBar::from_record(&record),
            Err(TicksError::Parse(_))
        ));
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2022, 4, 19)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();

        for s in [
            "2022-04-19 07:00:00",
            "2022-04-19T07:00:00",
            "2022-04-19T07:00:00.000Z",
            "2022-04-19 07:00:00.000",
        ] {
            assert_eq!(parse_provider_timestamp(s).unwrap(), expected, "{s}");
        }

        assert_eq!(
            parse_provider_timestamp("2022-04-19").unwrap(),
            expected.date().and_hms_opt(0, 0, 0).unwrap()
        );
        assert!(parse_provider_timestamp("19/04/2022").is_err());
    }

    #[test]
    fn test_to_dataframe() {
        let ts = NaiveDate::from_ymd_opt(2022, 4, 19)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        let result = QueryResult::new(
            vec![
                PriceBar::new(ts, 1.0, 2.0, 0.5, 1.5, 10.0).with_open_interest(100.0),
                PriceBar::new(ts, 1.5, 2.5, 1.0, 2.0, 20.0).without_volume(),
            ],
            200,
            Value::Null,
        );

        let df = result.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 7);
        assert_eq!(df.column("volume").unwrap().null_count(), 1);

        let cash = QueryResult::new(
            vec![PriceBar::new(ts, 1.0, 2.0, 0.5, 1.5, 10.0)],
            200,
            Value::Null,
        );
        assert_eq!(cash.to_dataframe().unwrap().width(), 6);
    }
}
