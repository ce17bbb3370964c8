#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ticks/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! ICICI Direct Breeze data provider.
//!
//! This crate implements the `ticks-core` provider traits for the
//! [Breeze API](https://api.icicidirect.com/breezeapi/documents/index.html).
//!
//! # Usage
//!
//! ```rust,ignore
//! use ticks_breeze::BreezeProvider;
//! use ticks_core::{HistoricalDataFetcher, InstrumentQuery, SessionCredentials};
//!
//! #[tokio::main]
//! async fn main() -> ticks_core::Result<()> {
//!     let fetcher = HistoricalDataFetcher::new(BreezeProvider::new());
//!     let credentials = SessionCredentials::new("api_key", "api_secret", "session_token");
//!     let session = fetcher.authenticate(&credentials).await?;
//!
//!     let result = fetcher.fetch_history(&session, &query).await?;
//!     println!("{} bars", result.len());
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode, header::CONTENT_TYPE};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use ticks_core::{
    Contract, HistoricalRequest, MarketDataProvider, MarketDataSession, ProviderPayload, Result,
    SessionCredentials, TicksError, to_wire_timestamp,
};
use tracing::debug;

/// Base URL for the Breeze v1 API.
const BREEZE_API_URL: &str = "https://api.icicidirect.com/breezeapi/api/v1";

/// Request timeout applied by the default client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status code Breeze reports for a successful call.
const STATUS_OK: u16 = 200;

/// ICICI Direct Breeze data provider.
///
/// Holds the HTTP client and endpoint; credentials are only handed over at
/// [`authenticate`](MarketDataProvider::authenticate) time.
#[derive(Clone)]
pub struct BreezeProvider {
    client: Client,
    base_url: String,
}

impl fmt::Debug for BreezeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreezeProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BreezeProvider {
    /// Create a new Breeze provider with default settings.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (TLS backend unavailable).
    /// Use [`with_client`](Self::with_client) to supply one instead.
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self::with_client(client)
    }

    /// Create a new Breeze provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: BREEZE_API_URL.to_string(),
        }
    }

    /// Point the provider at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the API root in use.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }
}

impl Default for BreezeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for BreezeProvider {
    type Session = BreezeSession;

    fn name(&self) -> &str {
        "ICICI Breeze"
    }

    async fn authenticate(&self, credentials: &SessionCredentials) -> Result<BreezeSession> {
        let body = json!({
            "SessionToken": credentials.session_token(),
            "AppKey": credentials.api_key(),
        })
        .to_string();

        debug!("Breeze request: customerdetails");
        let response = self
            .client
            .get(self.url("customerdetails"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TicksError::Network(e.to_string()))?;

        let status = response.status();
        let (http_status, payload) = match read_json(response).await {
            Err(TicksError::Network(msg)) if is_rejection(status) => {
                return Err(TicksError::Auth(msg));
            }
            other => other?,
        };
        let session_key = session_key_from_json(&payload, http_status)?;

        Ok(BreezeSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            app_key: credentials.api_key().to_string(),
            secret: credentials.api_secret().to_string(),
            session_key,
        })
    }
}

/// An authenticated Breeze session.
///
/// Every request is signed with the API secret; `Debug` output redacts it.
#[derive(Clone)]
pub struct BreezeSession {
    client: Client,
    base_url: String,
    app_key: String,
    secret: String,
    session_key: String,
}

impl fmt::Debug for BreezeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreezeSession")
            .field("base_url", &self.base_url)
            .field("app_key", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .field("session_key", &"[REDACTED]")
            .finish()
    }
}

impl BreezeSession {
    /// Sends a signed request and returns the HTTP status and JSON payload.
    async fn signed_get(&self, endpoint: &str, body: String) -> Result<(u16, Value)> {
        let timestamp = request_timestamp();
        let checksum = checksum(&timestamp, &body, &self.secret);

        debug!("Breeze request: {}", endpoint);
        let response = self
            .client
            .get(format!("{}/{endpoint}", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .header("X-Checksum", format!("token {checksum}"))
            .header("X-Timestamp", timestamp)
            .header("X-AppKey", &self.app_key)
            .header("X-SessionToken", &self.session_key)
            .body(body)
            .send()
            .await
            .map_err(|e| TicksError::Network(e.to_string()))?;

        read_json(response).await
    }
}

#[async_trait]
impl MarketDataSession for BreezeSession {
    async fn historical_bars(&self, request: &HistoricalRequest) -> Result<ProviderPayload> {
        let body = historical_body(request).to_string();
        let (http_status, payload) = self.signed_get("historicalcharts", body).await?;
        Ok(payload_from_json(payload, http_status))
    }
}

/// Reads a response body as JSON.
///
/// A body that is not JSON is a transport problem when the HTTP status is an
/// error, and a parse problem otherwise.
async fn read_json(response: Response) -> Result<(u16, Value)> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| TicksError::Network(e.to_string()))?;

    match serde_json::from_str(&text) {
        Ok(value) => Ok((status.as_u16(), value)),
        Err(_) if !status.is_success() => Err(TicksError::Network(format!("HTTP {status}: {text}"))),
        Err(e) => Err(TicksError::Parse(format!("{e}: {text}"))),
    }
}

/// True for the statuses a login endpoint uses to refuse credentials.
fn is_rejection(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Timestamp header value: UTC, whole seconds, `.000Z` suffix.
fn request_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S.000Z").to_string()
}

/// Hex SHA-256 over `timestamp + body + secret`.
fn checksum(timestamp: &str, body: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(body.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extracts the session key from a `customerdetails` answer.
fn session_key_from_json(payload: &Value, http_status: u16) -> Result<String> {
    let status = provider_status(payload, http_status);

    if status == STATUS_OK {
        if let Some(key) = payload
            .get("Success")
            .and_then(|s| s.get("session_token"))
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
        {
            return Ok(key.to_string());
        }
    }

    let reason = payload
        .get("Error")
        .and_then(Value::as_str)
        .unwrap_or("could not authenticate credentials");
    Err(TicksError::Auth(format!("{reason} (status {status})")))
}

/// Builds the `historicalcharts` request body.
fn historical_body(request: &HistoricalRequest) -> Value {
    let mut body = Map::new();
    body.insert("interval".into(), request.interval().as_str().into());
    body.insert("fromDate".into(), to_wire_timestamp(&request.start()).into());
    body.insert("toDate".into(), to_wire_timestamp(&request.end()).into());
    body.insert("stockCode".into(), request.symbol().as_str().into());
    body.insert("exchangeCode".into(), request.exchange().code().into());
    body.insert("productType".into(), request.product_type().as_str().into());

    match request.contract() {
        Contract::Cash => {}
        Contract::Futures { expiry } => {
            body.insert("expiryDate".into(), to_wire_timestamp(expiry).into());
            body.insert("right".into(), "others".into());
            body.insert("strikePrice".into(), "0".into());
        }
        Contract::Options {
            expiry,
            right,
            strike,
        } => {
            body.insert("expiryDate".into(), to_wire_timestamp(expiry).into());
            body.insert("right".into(), right.as_str().into());
            body.insert("strikePrice".into(), strike.to_string().into());
        }
    }

    Value::Object(body)
}

/// Classifies a Breeze answer.
///
/// Success needs status 200, no error message and a `Success` array.
fn payload_from_json(payload: Value, http_status: u16) -> ProviderPayload {
    let status = provider_status(&payload, http_status);

    let has_error = match payload.get("Error") {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    };

    let records = payload.get("Success").and_then(Value::as_array).cloned();

    match records {
        Some(records) if status == STATUS_OK && !has_error => ProviderPayload::Success {
            status,
            records,
            raw: payload,
        },
        _ => ProviderPayload::Failure {
            status,
            raw: payload,
        },
    }
}

/// Status reported in the payload, falling back to the HTTP status.
fn provider_status(payload: &Value, http_status: u16) -> u16 {
    payload
        .get("Status")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or(http_status)
}
