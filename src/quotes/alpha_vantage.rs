//! Alpha Vantage quote client
//!
//! Talks JSON-RPC 2.0 to the hosted Alpha Vantage MCP server and calls its
//! `GLOBAL_QUOTE` tool. The tool answers with text that is either a JSON
//! `"Global Quote"` object or a two-line CSV; anything else is kept raw.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::QuoteSettings;
use crate::error::OrchestrationError;
use crate::quotes::{Quote, QuoteData, QuoteSource};
use crate::Result;

const CSV_HEADER_PREFIX: &str = "symbol,open,high,low,price,volume";

pub struct AlphaVantageClient {
    client: Client,
    api_key: Option<String>,
    mcp_url: String,
}

impl AlphaVantageClient {
    pub fn new(settings: &QuoteSettings) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("agentic-rag-orchestrator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            mcp_url: settings.mcp_url.clone(),
        })
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            OrchestrationError::ToolError("ALPHA_VANTAGE_API_KEY is not configured".to_string())
        })?;

        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {
                "name": name,
                "arguments": arguments,
            }
        });

        debug!(tool = name, "Calling Alpha Vantage MCP");

        let response = self
            .client
            .post(&self.mcp_url)
            .query(&[("apikey", api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(|e| OrchestrationError::ToolError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrchestrationError::ToolError(format!(
                "Alpha Vantage MCP returned {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| OrchestrationError::ToolError(format!("Invalid JSON response: {}", e)))?;

        if let Some(error) = body.get("error") {
            return Err(OrchestrationError::ToolError(format!("MCP Error: {}", error)));
        }

        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl QuoteSource for AlphaVantageClient {
    async fn quote(&self, symbol: &str) -> Result<QuoteData> {
        let symbol = symbol.trim().to_uppercase();
        let result = self
            .call_tool("GLOBAL_QUOTE", json!({ "symbol": symbol }))
            .await?;

        let text = first_text_content(&result).ok_or_else(|| {
            OrchestrationError::ToolError(format!("No data received for {}", symbol))
        })?;

        parse_quote_payload(text, &symbol)
    }
}

/// `result.content[0].text` of an MCP tool call
fn first_text_content(result: &Value) -> Option<&str> {
    result
        .get("content")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
}

pub(crate) fn parse_quote_payload(data: &str, symbol: &str) -> Result<QuoteData> {
    let data = data.trim();

    if data.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<Value>(data) {
            if let Some(quote) = parsed.get("Global Quote") {
                return parse_global_quote(quote, symbol).map(QuoteData::Parsed);
            }
            for key in ["Error Message", "Note", "Information"] {
                if let Some(message) = parsed.get(key).and_then(Value::as_str) {
                    return Err(OrchestrationError::ToolError(message.to_string()));
                }
            }
        }
    } else if data.starts_with(CSV_HEADER_PREFIX) {
        return parse_csv_quote(data, symbol).map(QuoteData::Parsed);
    }

    warn!(symbol, "Unrecognized quote payload; passing through raw");
    Ok(QuoteData::Raw {
        symbol: symbol.to_string(),
        data: data.to_string(),
    })
}

fn parse_global_quote(quote: &Value, symbol: &str) -> Result<Quote> {
    fn text<'a>(quote: &'a Value, key: &str) -> &'a str {
        quote.get(key).and_then(Value::as_str).unwrap_or_default()
    }
    let field = |key: &str| text(quote, key);

    if quote.as_object().map(|o| o.is_empty()).unwrap_or(true) {
        return Err(OrchestrationError::ToolError(format!(
            "No quote data for {}",
            symbol
        )));
    }

    let symbol = match field("01. symbol") {
        "" => symbol.to_string(),
        s => s.to_string(),
    };

    Ok(Quote {
        price: number(field("05. price"), "price")?,
        change: number(field("09. change"), "change")?,
        change_percent: match field("10. change percent") {
            "" => "0%".to_string(),
            s => s.to_string(),
        },
        volume: number::<u64>(field("06. volume"), "volume")?,
        latest_trading_day: field("07. latest trading day").to_string(),
        previous_close: number(field("08. previous close"), "previous close")?,
        open: optional_number(field("02. open")),
        high: optional_number(field("03. high")),
        low: optional_number(field("04. low")),
        symbol,
    })
}

/// `symbol,open,high,low,price,volume,latestDay,previousClose,change,changePercent`
fn parse_csv_quote(data: &str, symbol: &str) -> Result<Quote> {
    let values: Vec<&str> = data
        .lines()
        .nth(1)
        .map(|line| line.split(',').map(str::trim).collect())
        .unwrap_or_default();

    if values.len() < 10 {
        return Err(OrchestrationError::ToolError(format!(
            "Failed to parse data: incomplete CSV quote for {}",
            symbol
        )));
    }

    Ok(Quote {
        symbol: values[0].to_string(),
        open: Some(number(values[1], "open")?),
        high: Some(number(values[2], "high")?),
        low: Some(number(values[3], "low")?),
        price: number(values[4], "price")?,
        volume: number(values[5], "volume")?,
        latest_trading_day: values[6].to_string(),
        previous_close: number(values[7], "previous close")?,
        change: number(values[8], "change")?,
        change_percent: values[9].to_string(),
    })
}

fn number<T: std::str::FromStr>(raw: &str, field: &str) -> Result<T> {
    let raw = raw.trim();
    let raw = if raw.is_empty() { "0" } else { raw };
    raw.parse().map_err(|_| {
        OrchestrationError::ToolError(format!("Failed to parse data: bad {} '{}'", field, raw))
    })
}

fn optional_number(raw: &str) -> Option<f64> {
    Some(raw.trim())
        .filter(|r| !r.is_empty())
        .and_then(|r| r.parse().ok())
}
