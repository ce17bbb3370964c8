//! Instrument and request types.
//!
//! This module defines the descriptors used to ask a provider for history:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`Exchange`], [`ProductType`], [`OptionRight`] - Closed request enums
//! - [`InstrumentQuery`] - What the caller asks for
//! - [`Contract`] - The validated product-specific part of a query
//! - [`HistoricalRequest`] - What a session is allowed to send

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TicksError};
use crate::interval::Interval;

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, trimming and converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the symbol is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

/// Exchange segment an instrument trades on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// National Stock Exchange cash segment (equity spot, indices).
    #[serde(rename = "NSE", alias = "nse")]
    Nse,
    /// National Stock Exchange futures & options segment.
    #[serde(rename = "NFO", alias = "nfo")]
    Nfo,
}

impl Exchange {
    /// Returns the exchange code sent on the wire.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Nfo => "NFO",
        }
    }

    /// Returns true for the derivatives segment.
    #[must_use]
    pub const fn is_derivatives(&self) -> bool {
        matches!(self, Self::Nfo)
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of product being queried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// Spot equity or index.
    #[default]
    Cash,
    /// Futures contract.
    Futures,
    /// Options contract.
    Options,
}

impl ProductType {
    /// Returns the product code sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Futures => "futures",
            Self::Options => "options",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right of an options contract.
///
/// `Others` is what the provider expects for non-option derivatives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    /// Put option.
    Put,
    /// Call option.
    Call,
    /// Not an option.
    Others,
}

impl OptionRight {
    /// Returns the right code sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Call => "call",
            Self::Others => "others",
        }
    }
}

impl fmt::Display for OptionRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats a timestamp the way providers expect it: ISO-8601, millisecond
/// precision, `Z` suffix (e.g. `2022-04-19T07:00:00.000Z`).
#[must_use]
pub fn to_wire_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The validated product-specific part of a query.
///
/// Each variant carries exactly the fields its product requires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Contract {
    /// Spot instrument, no contract terms.
    Cash,
    /// Futures contract.
    Futures {
        /// Expiry of the contract.
        expiry: DateTime<Utc>,
    },
    /// Options contract.
    Options {
        /// Expiry of the contract.
        expiry: DateTime<Utc>,
        /// Put or call.
        right: OptionRight,
        /// Strike price.
        strike: f64,
    },
}

impl Contract {
    /// Returns the product type of this contract.
    #[must_use]
    pub const fn product_type(&self) -> ProductType {
        match self {
            Self::Cash => ProductType::Cash,
            Self::Futures { .. } => ProductType::Futures,
            Self::Options { .. } => ProductType::Options,
        }
    }

    /// Returns the expiry, if the contract has one.
    #[must_use]
    pub const fn expiry(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Cash => None,
            Self::Futures { expiry } | Self::Options { expiry, .. } => Some(*expiry),
        }
    }
}

/// A request for historical bars of one instrument.
///
/// Fields mirror what callers naturally have at hand; the product-specific
/// ones are optional and checked by [`InstrumentQuery::contract`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentQuery {
    /// Instrument symbol (e.g. `NIFTY`).
    pub symbol: Symbol,
    /// Exchange segment.
    pub exchange: Exchange,
    /// Product type.
    pub product_type: ProductType,
    /// Bar interval.
    #[serde(default)]
    pub interval: Interval,
    /// Start of the requested range.
    pub from: DateTime<Utc>,
    /// End of the requested range.
    pub to: DateTime<Utc>,
    /// Contract expiry (futures and options).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Option right (options only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<OptionRight>,
    /// Strike price (options only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike: Option<f64>,
}

impl InstrumentQuery {
    /// Creates a query with no contract terms set.
    #[must_use]
    pub fn new(
        symbol: impl Into<Symbol>,
        exchange: Exchange,
        product_type: ProductType,
        interval: Interval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            exchange,
            product_type,
            interval,
            from,
            to,
            expiry: None,
            right: None,
            strike: None,
        }
    }

    /// Creates a cash (spot) query.
    #[must_use]
    pub fn cash(
        symbol: impl Into<Symbol>,
        exchange: Exchange,
        interval: Interval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Self {
        Self::new(symbol, exchange, ProductType::Cash, interval, from, to)
    }

    /// Creates a futures query.
    #[must_use]
    pub fn futures(
        symbol: impl Into<Symbol>,
        interval: Interval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Self {
        Self::new(symbol, Exchange::Nfo, ProductType::Futures, interval, from, to)
            .with_expiry(expiry)
    }

    /// Creates an options query.
    #[must_use]
    pub fn options(
        symbol: impl Into<Symbol>,
        interval: Interval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        expiry: DateTime<Utc>,
        right: OptionRight,
        strike: f64,
    ) -> Self {
        Self::new(symbol, Exchange::Nfo, ProductType::Options, interval, from, to)
            .with_expiry(expiry)
            .with_right(right)
            .with_strike(strike)
    }

    /// Sets the contract expiry.
    #[must_use]
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Sets the option right.
    #[must_use]
    pub fn with_right(mut self, right: OptionRight) -> Self {
        self.right = Some(right);
        self
    }

    /// Sets the strike price.
    #[must_use]
    pub fn with_strike(mut self, strike: f64) -> Self {
        self.strike = Some(strike);
        self
    }

    /// Clears the strike price.
    #[must_use]
    pub fn without_strike(mut self) -> Self {
        self.strike = None;
        self
    }

    /// Checks the query and returns its contract terms.
    ///
    /// Options need expiry, right and strike; futures need an expiry; cash
    /// needs nothing and ignores whatever contract terms are set. Futures and
    /// options must be queried on a derivatives segment.
    pub fn contract(&self) -> Result<Contract> {
        if self.symbol.is_empty() {
            return Err(TicksError::Validation("symbol must not be empty".to_string()));
        }

        if self.from > self.to {
            return Err(TicksError::Validation(format!(
                "from {} is after to {}",
                to_wire_timestamp(&self.from),
                to_wire_timestamp(&self.to)
            )));
        }

        if self.product_type != ProductType::Cash && !self.exchange.is_derivatives() {
            return Err(TicksError::Validation(format!(
                "{} {} query must use a derivatives exchange, not {}",
                self.symbol, self.product_type, self.exchange
            )));
        }

        match self.product_type {
            ProductType::Cash => Ok(Contract::Cash),
            ProductType::Futures => {
                let expiry = self.require_expiry()?;
                Ok(Contract::Futures { expiry })
            }
            ProductType::Options => {
                let expiry = self.require_expiry()?;
                let right = match self.right {
                    Some(OptionRight::Others) => {
                        return Err(TicksError::Validation(format!(
                            "{} options query needs a put or call right",
                            self.symbol
                        )));
                    }
                    Some(right) => right,
                    None => {
                        return Err(TicksError::Validation(format!(
                            "{} options query is missing the option right",
                            self.symbol
                        )));
                    }
                };
                let strike = self.strike.ok_or_else(|| {
                    TicksError::Validation(format!(
                        "{} options query is missing the strike price",
                        self.symbol
                    ))
                })?;
                if !strike.is_finite() || strike <= 0.0 {
                    return Err(TicksError::Validation(format!(
                        "strike price must be a positive number, got {strike}"
                    )));
                }
                Ok(Contract::Options {
                    expiry,
                    right,
                    strike,
                })
            }
        }
    }

    fn require_expiry(&self) -> Result<DateTime<Utc>> {
        self.expiry.ok_or_else(|| {
            TicksError::Validation(format!(
                "{} {} query is missing the expiry date",
                self.symbol, self.product_type
            ))
        })
    }
}

/// A validated historical request, ready to be sent by a session.
///
/// Only obtainable through [`HistoricalRequest::from_query`], so sessions
/// never see a query that violates the per-product requirements.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoricalRequest {
    symbol: Symbol,
    exchange: Exchange,
    interval: Interval,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    contract: Contract,
}

impl HistoricalRequest {
    /// Validates a query and builds the request for it.
    pub fn from_query(query: &InstrumentQuery) -> Result<Self> {
        let contract = query.contract()?;
        Ok(Self {
            symbol: query.symbol.clone(),
            exchange: query.exchange,
            interval: query.interval,
            from: query.from,
            to: query.to,
            contract,
        })
    }

    /// Instrument symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Exchange segment.
    #[must_use]
    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Bar interval.
    #[must_use]
    pub const fn interval(&self) -> Interval {
        self.interval
    }

    /// Start of the range.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.from
    }

    /// End of the range.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.to
    }

    /// Contract terms.
    #[must_use]
    pub const fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Product type.
    #[must_use]
    pub const fn product_type(&self) -> ProductType {
        self.contract.product_type()
    }
}

impl fmt::Display for HistoricalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.symbol,
            self.exchange,
            self.product_type(),
            self.interval
        )?;
        match self.contract {
            Contract::Cash => Ok(()),
            Contract::Futures { expiry } => write!(f, " exp {}", expiry.date_naive()),
            Contract::Options {
                expiry,
                right,
                strike,
            } => write!(f, " exp {} {right} {strike}", expiry.date_naive()),
        }
    }
}
