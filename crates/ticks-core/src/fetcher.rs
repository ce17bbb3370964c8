//! Historical data fetcher.
//!
//! [`HistoricalDataFetcher`] turns an [`InstrumentQuery`] into exactly one
//! provider round trip and maps the answer into a [`QueryResult`].

use tracing::{debug, info, warn};

use crate::{
    bar::{PriceBar, QueryResult},
    error::{Result, TicksError},
    session::{MarketDataProvider, MarketDataSession, ProviderPayload, SessionCredentials},
    types::{HistoricalRequest, InstrumentQuery},
};

/// Fetches historical bars through a [`MarketDataProvider`].
///
/// # Example
///
/// ```rust,ignore
/// use ticks_core::{HistoricalDataFetcher, InstrumentQuery, SessionCredentials};
///
/// let fetcher = HistoricalDataFetcher::new(provider);
/// let session = fetcher.authenticate(&credentials).await?;
/// let result = fetcher.fetch_history(&session, &query).await?;
/// println!("{} bars", result.len());
/// ```
#[derive(Debug)]
pub struct HistoricalDataFetcher<P> {
    provider: P,
}

impl<P: MarketDataProvider> HistoricalDataFetcher<P> {
    /// Creates a fetcher backed by `provider`.
    #[must_use]
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns the underlying provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Opens a session with the provider.
    ///
    /// Blank credential fields are rejected without contacting the provider.
    pub async fn authenticate(&self, credentials: &SessionCredentials) -> Result<P::Session> {
        credentials.validate()?;

        debug!(provider = self.provider.name(), "Authenticating");
        let session = self.provider.authenticate(credentials).await?;
        info!(provider = self.provider.name(), "Session established");

        Ok(session)
    }

    /// Fetches the bars described by `query` using `session`.
    pub async fn fetch_history(
        &self,
        session: &P::Session,
        query: &InstrumentQuery,
    ) -> Result<QueryResult> {
        fetch_history(session, query).await
    }
}

/// Fetches the bars described by `query` using any session.
///
/// The query is validated first; an invalid query never reaches the session.
/// A provider failure is returned as [`TicksError::Provider`] carrying the raw
/// payload.
pub async fn fetch_history<S>(session: &S, query: &InstrumentQuery) -> Result<QueryResult>
where
    S: MarketDataSession + ?Sized,
{
    let request = HistoricalRequest::from_query(query)?;

    debug!(request = %request, "Fetching historical bars");
    let payload = session.historical_bars(&request).await?;

    into_result(payload).inspect_err(|e| {
        warn!(request = %request, error = %e, "Historical request failed");
    })
}

/// Maps a provider payload into a result, preserving record order.
fn into_result(payload: ProviderPayload) -> Result<QueryResult> {
    match payload {
        ProviderPayload::Failure { status, raw } => Err(TicksError::Provider {
            status,
            payload: raw,
        }),
        ProviderPayload::Success { status, raw, .. } if !(200..300).contains(&status) => {
            Err(TicksError::Provider {
                status,
                payload: raw,
            })
        }
        ProviderPayload::Success {
            status,
            records,
            raw,
        } => {
            let bars = records
                .iter()
                .map(PriceBar::from_record)
                .collect::<Result<Vec<_>>>()?;
            Ok(QueryResult::new(bars, status, raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        interval::Interval,
        stub::StubProvider,
        types::{Exchange, OptionRight, ProductType},
    };
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::{Value, json};

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 4, day, hour, 0, 0).unwrap()
    }

    fn nifty_put() -> InstrumentQuery {
        InstrumentQuery::new(
            "NIFTY",
            Exchange::Nfo,
            ProductType::Options,
            Interval::OneMinute,
            ts(19, 7),
            ts(19, 18),
        )
        .with_expiry(ts(21, 7))
        .with_right(OptionRight::Put)
        .with_strike(17000.0)
    }

    fn record(minute: u32, close: &str) -> Value {
        json!({
            "datetime": format!("2022-04-19 09:{minute:02}:00"),
            "open": "107.35",
            "high": "112.9",
            "low": "105.05",
            "close": close,
            "volume": "884100",
            "open_interest": "1254300",
            "stock_code": "NIFTY",
            "right": "Put",
            "strike_price": "17000"
        })
    }

    fn credentials() -> SessionCredentials {
        SessionCredentials::new("key", "secret", "token")
    }

    #[tokio::test]
    async fn test_options_scenario_returns_bars_in_order() {
        let provider = StubProvider::with_records(vec![
            record(15, "110.25"),
            record(16, "109.8"),
            record(17, "111.05"),
        ]);
        let fetcher = HistoricalDataFetcher::new(provider);
        let session = fetcher.authenticate(&credentials()).await.unwrap();

        let result = fetcher.fetch_history(&session, &nifty_put()).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.status(), 200);
        let closes: Vec<f64> = result.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![110.25, 109.8, 111.05]);
        let minutes: Vec<String> = result
            .iter()
            .map(|b| b.timestamp.format("%H:%M").to_string())
            .collect();
        assert_eq!(minutes, vec!["09:15", "09:16", "09:17"]);

        let calls = session.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].symbol().as_str(), "NIFTY");
        assert_eq!(calls[0].product_type(), ProductType::Options);
    }

    #[tokio::test]
    async fn test_missing_strike_makes_no_call() {
        let provider = StubProvider::with_records(vec![record(15, "110.25")]);
        let fetcher = HistoricalDataFetcher::new(provider);
        let session = fetcher.authenticate(&credentials()).await.unwrap();

        let query = nifty_put().without_strike();
        let err = fetcher.fetch_history(&session, &query).await.unwrap_err();

        assert!(matches!(err, TicksError::Validation(_)));
        assert!(err.is_local());
        assert!(session.calls().is_empty());
        assert!(fetcher.provider().calls().is_empty());
    }

    #[tokio::test]
    async fn test_options_missing_any_term_is_rejected() {
        let provider = StubProvider::with_records(vec![]);
        let fetcher = HistoricalDataFetcher::new(provider);
        let session = fetcher.authenticate(&credentials()).await.unwrap();

        let mut no_expiry = nifty_put();
        no_expiry.expiry = None;
        let mut no_right = nifty_put();
        no_right.right = None;

        for query in [no_expiry, no_right, nifty_put().without_strike()] {
            let err = fetcher.fetch_history(&session, &query).await.unwrap_err();
            assert!(matches!(err, TicksError::Validation(_)));
        }
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cash_query_ignores_contract_terms() {
        let provider = StubProvider::with_records(vec![record(15, "17110.45")]);
        let fetcher = HistoricalDataFetcher::new(provider);
        let session = fetcher.authenticate(&credentials()).await.unwrap();

        let mut query = nifty_put();
        query.exchange = Exchange::Nse;
        query.product_type = ProductType::Cash;
        query.strike = None;

        let result = fetcher.fetch_history(&session, &query).await.unwrap();
        assert_eq!(result.len(), 1);

        let calls = session.calls();
        assert_eq!(calls[0].product_type(), ProductType::Cash);
        assert_eq!(calls[0].contract().expiry(), None);
    }

    #[tokio::test]
    async fn test_provider_failure_wraps_payload() {
        let failure = json!({"Success": null, "Status": 500, "Error": "Invalid stock code"});
        let provider = StubProvider::failing(500, failure.clone());
        let fetcher = HistoricalDataFetcher::new(provider);
        let session = fetcher.authenticate(&credentials()).await.unwrap();

        let err = fetcher.fetch_history(&session, &nifty_put()).await.unwrap_err();

        match err {
            TicksError::Provider { status, payload } => {
                assert_eq!(status, 500);
                assert_eq!(payload, failure);
            }
            other => panic!("expected provider error, got {other:?}"),
        }
        assert_eq!(session.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_success_with_error_status_is_failure() {
        let payload = ProviderPayload::Success {
            status: 503,
            records: vec![record(15, "1")],
            raw: json!({"Status": 503}),
        };
        let provider = StubProvider::returning(payload);
        let fetcher = HistoricalDataFetcher::new(provider);
        let session = fetcher.authenticate(&credentials()).await.unwrap();

        let err = fetcher.fetch_history(&session, &nifty_put()).await.unwrap_err();
        assert!(matches!(err, TicksError::Provider { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_record_is_parse_error() {
        let provider = StubProvider::with_records(vec![json!({"datetime": "nope"})]);
        let fetcher = HistoricalDataFetcher::new(provider);
        let session = fetcher.authenticate(&credentials()).await.unwrap();

        let err = fetcher.fetch_history(&session, &nifty_put()).await.unwrap_err();
        assert!(matches!(err, TicksError::Parse(_)));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_blank_credentials() {
        let fetcher = HistoricalDataFetcher::new(StubProvider::with_records(vec![]));
        let err = fetcher
            .authenticate(&SessionCredentials::new("key", "", "token"))
            .await
            .unwrap_err();
        assert!(matches!(err, TicksError::Auth(_)));
    }

    #[tokio::test]
    async fn test_authenticate_provider_rejection() {
        let fetcher = HistoricalDataFetcher::new(StubProvider::rejecting_auth());
        let err = fetcher.authenticate(&credentials()).await.unwrap_err();
        assert!(matches!(err, TicksError::Auth(_)));
    }
}
