use serde::{Deserialize, Serialize};

pub const DEFAULT_NEWS_LIMIT: u32 = 10;
pub const MIN_NEWS_LIMIT: u32 = 1;
pub const MAX_NEWS_LIMIT: u32 = 50;
pub const MAX_SYMBOLS: usize = 5;

/// An inbound analysis request: which instruments to analyze and how much news to read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Instrument identifiers, e.g. `["BTCUSD"]`. The first one is the primary symbol.
    pub symbols: Vec<String>,
    #[serde(default = "default_news_limit")]
    pub news_limit: u32,
}

fn default_news_limit() -> u32 {
    DEFAULT_NEWS_LIMIT
}

impl AnalysisRequest {
    pub fn new(symbols: Vec<String>, news_limit: u32) -> Self {
        Self {
            symbols,
            news_limit,
        }
    }

    pub fn single(symbol: &str) -> Self {
        Self::new(vec![symbol.to_string()], DEFAULT_NEWS_LIMIT)
    }

    /// The symbol market-wide lookups are keyed on.
    pub fn primary_symbol(&self) -> Option<&str> {
        self.symbols.first().map(String::as_str)
    }
}
