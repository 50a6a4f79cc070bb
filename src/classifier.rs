//! Tool selection from planner model output
//!
//! The planner model answers in free text. We look for the literal tool
//! names in it (quote lookup first) and pull a ticker out of the response
//! and the original query when a quote is requested.

use crate::tools::{DEFAULT_SYMBOL, RAG_SEARCH, STOCK_QUOTE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSelection {
    QuoteLookup { symbol: String },
    KnowledgeSearch { question: String },
    /// The response named neither tool
    Unclassified,
}

/// Ticker symbols recognized verbatim, checked in this order
const KNOWN_SYMBOLS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NFLX", "NVDA", "AMD", "INTC",
];

/// Company names mapped to their ticker, checked after `KNOWN_SYMBOLS`
const COMPANY_SYMBOLS: &[(&str, &str)] = &[
    ("APPLE", "AAPL"),
    ("MICROSOFT", "MSFT"),
    ("GOOGLE", "GOOGL"),
    ("ALPHABET", "GOOGL"),
    ("AMAZON", "AMZN"),
    ("TESLA", "TSLA"),
    ("META", "META"),
    ("FACEBOOK", "META"),
    ("NETFLIX", "NFLX"),
    ("NVIDIA", "NVDA"),
    ("AMD", "AMD"),
    ("INTEL", "INTC"),
];

pub fn classify_response(response: &str, query: &str) -> ToolSelection {
    let lowered = response.to_lowercase();

    if lowered.contains(STOCK_QUOTE) {
        ToolSelection::QuoteLookup {
            symbol: extract_symbol(&format!("{} {}", response, query)),
        }
    } else if lowered.contains(RAG_SEARCH) {
        ToolSelection::KnowledgeSearch {
            question: query.to_string(),
        }
    } else {
        ToolSelection::Unclassified
    }
}

/// First known ticker, else first known company name, else the default.
///
/// Matching is by substring on the upper-cased text.
pub fn extract_symbol(text: &str) -> String {
    let upper = text.to_uppercase();

    KNOWN_SYMBOLS
        .iter()
        .copied()
        .find(|symbol| upper.contains(symbol))
        .or_else(|| {
            COMPANY_SYMBOLS
                .iter()
                .find(|(company, _)| upper.contains(company))
                .map(|(_, symbol)| *symbol)
        })
        .unwrap_or(DEFAULT_SYMBOL)
        .to_string()
}
