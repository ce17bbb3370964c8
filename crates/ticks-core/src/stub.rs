//! Stub provider for tests and dry runs.
//!
//! [`StubProvider`] answers every historical request with a canned
//! [`ProviderPayload`] and records the requests it receives.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

use crate::{
    error::{Result, TicksError},
    session::{MarketDataProvider, MarketDataSession, ProviderPayload, SessionCredentials},
    types::HistoricalRequest,
};

type CallLog = Arc<Mutex<Vec<HistoricalRequest>>>;

/// A provider that never touches the network.
///
/// Sessions it issues share its call log, so requests can be inspected from
/// either side.
#[derive(Debug, Clone)]
pub struct StubProvider {
    payload: ProviderPayload,
    reject_auth: bool,
    calls: CallLog,
}

impl StubProvider {
    /// Creates a stub that answers with `payload`.
    #[must_use]
    pub fn returning(payload: ProviderPayload) -> Self {
        Self {
            payload,
            reject_auth: false,
            calls: Arc::default(),
        }
    }

    /// Creates a stub that answers with a success payload holding `records`.
    #[must_use]
    pub fn with_records(records: Vec<Value>) -> Self {
        let raw = json!({ "Success": records, "Status": 200, "Error": null });
        Self::returning(ProviderPayload::Success {
            status: 200,
            records,
            raw,
        })
    }

    /// Creates a stub that answers with a failure payload.
    #[must_use]
    pub fn failing(status: u16, raw: Value) -> Self {
        Self::returning(ProviderPayload::Failure { status, raw })
    }

    /// Creates a stub whose authentication always fails.
    #[must_use]
    pub fn rejecting_auth() -> Self {
        Self {
            reject_auth: true,
            ..Self::with_records(Vec::new())
        }
    }

    /// Returns the requests received so far by any session of this stub.
    #[must_use]
    pub fn calls(&self) -> Vec<HistoricalRequest> {
        snapshot(&self.calls)
    }
}

#[async_trait]
impl MarketDataProvider for StubProvider {
    type Session = StubSession;

    fn name(&self) -> &str {
        "stub"
    }

    async fn authenticate(&self, _credentials: &SessionCredentials) -> Result<StubSession> {
        if self.reject_auth {
            return Err(TicksError::Auth("stub rejects all credentials".to_string()));
        }
        Ok(StubSession {
            payload: self.payload.clone(),
            calls: Arc::clone(&self.calls),
        })
    }
}

/// Session issued by [`StubProvider`].
#[derive(Debug, Clone)]
pub struct StubSession {
    payload: ProviderPayload,
    calls: CallLog,
}

impl StubSession {
    /// Returns the requests received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<HistoricalRequest> {
        snapshot(&self.calls)
    }
}

#[async_trait]
impl MarketDataSession for StubSession {
    async fn historical_bars(&self, request: &HistoricalRequest) -> Result<ProviderPayload> {
        trace!(request = %request, "StubSession: recording request");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        Ok(self.payload.clone())
    }
}

fn snapshot(calls: &CallLog) -> Vec<HistoricalRequest> {
    calls
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
