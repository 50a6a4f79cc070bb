//! Quote lookup tool

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::models::{Query, ToolInput, ToolParameters};
use crate::quotes::{Quote, QuoteData, QuoteSource};
use crate::tools::{Tool, DEFAULT_SYMBOL, STOCK_QUOTE};
use crate::Result;

pub struct StockQuoteTool {
    source: Arc<dyn QuoteSource>,
}

impl StockQuoteTool {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for StockQuoteTool {
    fn name(&self) -> &'static str {
        STOCK_QUOTE
    }

    fn description(&self) -> &'static str {
        "Get real-time stock market data for a given stock symbol"
    }

    fn parameter_defaults(&self, _query: &Query) -> ToolParameters {
        let mut defaults = ToolParameters::new();
        defaults.insert("symbol".to_string(), json!(DEFAULT_SYMBOL));
        defaults
    }

    async fn invoke(&self, input: &ToolInput) -> Result<String> {
        let symbol = input.require_str("symbol")?.trim().to_uppercase();
        let data = self.source.quote(&symbol).await?;
        Ok(describe_quote(&data))
    }
}

/// Human-readable one-paragraph description of a quote.
pub fn describe_quote(data: &QuoteData) -> String {
    match data {
        QuoteData::Parsed(quote) => describe_parsed(quote),
        QuoteData::Raw { symbol, data } => {
            format!("Stock data for {}: {}", symbol.to_uppercase(), data)
        }
    }
}

fn describe_parsed(quote: &Quote) -> String {
    let direction = if quote.change >= 0.0 { "up" } else { "down" };

    let mut out = format!(
        "{} is currently trading at ${:.2}, {} ${:.2} ({}) from previous close.",
        quote.symbol.to_uppercase(),
        quote.price,
        direction,
        quote.change.abs(),
        quote.change_percent
    );

    if quote.volume > 0 {
        out.push_str(&format!(
            " Trading volume: {} shares.",
            group_thousands(quote.volume)
        ));
    }

    if !quote.latest_trading_day.is_empty() {
        out.push_str(&format!(" Last updated: {}.", quote.latest_trading_day));
    }

    if let (Some(open), Some(high), Some(low)) = (quote.open, quote.high, quote.low) {
        out.push_str(&format!(
            " Day's range: ${:.2} - ${:.2}. Opened at ${:.2}.",
            low, high, open
        ));
    }

    out
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestrationError;
    use std::sync::Mutex;

    struct FixedSource {
        reply: std::result::Result<QuoteData, String>,
        requested: Mutex<Vec<String>>,
    }

    impl FixedSource {
        fn new(reply: std::result::Result<QuoteData, String>) -> Self {
            Self {
                reply,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QuoteSource for FixedSource {
        async fn quote(&self, symbol: &str) -> Result<QuoteData> {
            self.requested.lock().unwrap().push(symbol.to_string());
            self.reply.clone().map_err(OrchestrationError::ToolError)
        }
    }

    fn sample_quote() -> Quote {
        Quote {
            symbol: "aapl".to_string(),
            price: 190.123,
            change: -1.25,
            change_percent: "-0.6618%".to_string(),
            volume: 51_234_567,
            latest_trading_day: "2024-05-01".to_string(),
            previous_close: 191.37,
            open: None,
            high: None,
            low: None,
        }
    }

    #[test]
    fn test_describe_parsed_quote() {
        let text = describe_quote(&QuoteData::Parsed(sample_quote()));
        assert_eq!(
            text,
            "AAPL is currently trading at $190.12, down $1.25 (-0.6618%) from previous close. \
             Trading volume: 51,234,567 shares. Last updated: 2024-05-01."
        );
    }

    #[test]
    fn test_describe_includes_day_range() {
        let quote = Quote {
            open: Some(189.5),
            high: Some(191.0),
            low: Some(188.75),
            ..sample_quote()
        };
        let text = describe_quote(&QuoteData::Parsed(quote));
        assert!(text.ends_with("Day's range: $188.75 - $191.00. Opened at $189.50."));
    }

    #[test]
    fn test_describe_raw_payload() {
        let text = describe_quote(&QuoteData::Raw {
            symbol: "tsla".to_string(),
            data: "market closed".to_string(),
        });
        assert_eq!(text, "Stock data for TSLA: market closed");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[tokio::test]
    async fn test_invoke_normalizes_symbol() {
        let source = Arc::new(FixedSource::new(Ok(QuoteData::Parsed(sample_quote()))));
        let tool = StockQuoteTool::new(source.clone());

        let mut params = ToolParameters::new();
        params.insert("symbol".to_string(), json!(" msft "));
        tool.invoke(&ToolInput::new(STOCK_QUOTE, params)).await.unwrap();

        assert_eq!(*source.requested.lock().unwrap(), vec!["MSFT"]);
    }

    #[tokio::test]
    async fn test_source_failure_is_returned() {
        let tool = StockQuoteTool::new(Arc::new(FixedSource::new(Err("rate limited".to_string()))));
        let input = ToolInput::new(STOCK_QUOTE, tool.parameter_defaults(&Query::in_default_session("x")));

        let error = tool.invoke(&input).await.unwrap_err();
        assert!(error.to_string().contains("rate limited"));
    }
}
