//! Provider and session traits.
//!
//! This module defines the capability the fetcher depends on:
//!
//! - [`SessionCredentials`] - What a provider needs to open a session
//! - [`MarketDataProvider`] - Opens sessions
//! - [`MarketDataSession`] - Answers historical requests
//! - [`ProviderPayload`] - A provider's answer, success or failure

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::{self, Debug};

use crate::{
    error::{Result, TicksError},
    types::HistoricalRequest,
};

/// Credentials used to open a provider session.
///
/// Never serialized; `Debug` output redacts every field.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct SessionCredentials {
    api_key: String,
    api_secret: String,
    session_token: String,
}

impl SessionCredentials {
    /// Creates a new set of credentials.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            session_token: session_token.into(),
        }
    }

    /// Application key issued by the provider.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Secret paired with the application key.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// One-time session token obtained from the provider's login flow.
    #[must_use]
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Checks that no field is blank.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("api_key", &self.api_key),
            ("api_secret", &self.api_secret),
            ("session_token", &self.session_token),
        ] {
            if value.trim().is_empty() {
                return Err(TicksError::Auth(format!("{name} is empty")));
            }
        }
        Ok(())
    }
}

impl Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .finish()
    }
}

/// A provider's answer to a historical request.
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderPayload {
    /// The provider returned records.
    Success {
        /// Status code reported by the provider.
        status: u16,
        /// Records in provider order.
        records: Vec<Value>,
        /// The full payload.
        raw: Value,
    },
    /// The provider reported a failure.
    Failure {
        /// Status code reported by the provider.
        status: u16,
        /// The full payload.
        raw: Value,
    },
}

impl ProviderPayload {
    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Success { status, .. } | Self::Failure { status, .. } => *status,
        }
    }

    /// Returns the full payload.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        match self {
            Self::Success { raw, .. } | Self::Failure { raw, .. } => raw,
        }
    }

    /// Returns true for a success payload.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Source of provider sessions.
///
/// Implementations own whatever transport they need; authentication is the
/// only way to obtain a [`MarketDataSession`].
#[async_trait]
pub trait MarketDataProvider: Send + Sync + Debug {
    /// Session type issued by this provider.
    type Session: MarketDataSession;

    /// Returns the name of this provider (e.g. "ICICI Breeze").
    fn name(&self) -> &str;

    /// Opens a session with the provider.
    async fn authenticate(&self, credentials: &SessionCredentials) -> Result<Self::Session>;
}

/// An authenticated provider session.
#[async_trait]
pub trait MarketDataSession: Send + Sync + Debug {
    /// Performs one historical data round trip.
    ///
    /// Transport failures are errors; anything the provider answered,
    /// including a failure, is returned as a [`ProviderPayload`].
    async fn historical_bars(&self, request: &HistoricalRequest) -> Result<ProviderPayload>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_redacts_credentials() {
        let creds = SessionCredentials::new("key_123", "secret_456", "token_789");
        let debug_str = format!("{creds:?}");
        assert!(!debug_str.contains("key_123"));
        assert!(!debug_str.contains("secret_456"));
        assert!(!debug_str.contains("token_789"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_validate_blank_field() {
        assert!(SessionCredentials::new("k", "s", "t").validate().is_ok());
        let err = SessionCredentials::new("k", " ", "t").validate().unwrap_err();
        assert!(matches!(err, TicksError::Auth(ref m) if m.contains("api_secret")));
    }

    #[test]
    fn test_credentials_from_json() {
        let creds: SessionCredentials = serde_json::from_value(json!({
            "api_key": "k",
            "api_secret": "s",
            "session_token": "t"
        }))
        .unwrap();
        assert_eq!(creds, SessionCredentials::new("k", "s", "t"));
    }

    #[test]
    fn test_payload_accessors() {
        let payload = ProviderPayload::Failure {
            status: 500,
            raw: json!({"Error": "boom"}),
        };
        assert_eq!(payload.status(), 500);
        assert!(!payload.is_success());
        assert_eq!(payload.raw()["Error"], "boom");
    }
}
