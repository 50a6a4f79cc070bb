//! Market quote sources
//!
//! [`QuoteSource`] is the symbol-keyed market data provider the quote tool
//! consumes. The Alpha Vantage client is the production source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub mod alpha_vantage;
pub use alpha_vantage::AlphaVantageClient;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: String,
    pub volume: u64,
    pub latest_trading_day: String,
    pub previous_close: f64,
    /// Intraday fields are only present in some payload formats
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuoteData {
    Parsed(Quote),
    /// Payload in a shape we don't parse; passed through as text
    Raw { symbol: String, data: String },
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<QuoteData>;
}
