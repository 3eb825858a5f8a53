use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The four independent market signals gathered before the committee convenes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    News,
    Technical,
    FearGreed,
    SupportResistance,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        SignalKind::News,
        SignalKind::Technical,
        SignalKind::FearGreed,
        SignalKind::SupportResistance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::News => "news",
            SignalKind::Technical => "technical",
            SignalKind::FearGreed => "fear_greed",
            SignalKind::SupportResistance => "support_resistance",
        }
    }

    /// Market-wide signals are not tied to a single instrument.
    pub fn is_market_wide(&self) -> bool {
        matches!(self, SignalKind::FearGreed)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NewsSentiment {
    Positive,
    Negative,
    Mixed,
    Neutral,
}

/// Summary of recent headlines and their likely market impact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsAnalysis {
    pub sentiment: NewsSentiment,
    pub context_summary: String,
    pub market_opinion: String,
    /// Headlines the analysis was based on, newest first.
    #[serde(default)]
    pub headlines: Vec<String>,
}

/// One news item as the news pipeline caches it, per symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsHeadline {
    pub id: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewsHeadline {
    /// The headline, or the summary when the headline is blank.
    pub fn text(&self) -> &str {
        let headline = self.headline.trim();
        if headline.is_empty() {
            self.summary.as_deref().map(str::trim).unwrap_or_default()
        } else {
            headline
        }
    }
}

/// State of the SMA 25 / SMA 200 crossover.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverStatus {
    GoldenCross,
    DeathCross,
    Neutral,
    Approaching,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    Bullish,
    Bearish,
    Sideways,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalAnalysis {
    pub trend_analysis: String,
    pub crossover_status: CrossoverStatus,
    pub momentum: Momentum,
    pub conclusion: String,
}

/// Crypto Fear & Greed index reading (0 = extreme fear, 100 = extreme greed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FearGreedReading {
    pub index: u8,
    pub classification: String,
}

/// Nearest price levels around the current price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupportResistanceLevels {
    pub current_price: Decimal,
    pub nearest_support: Option<Decimal>,
    /// Signed percentage from the current price, e.g. `"-1.55%"`.
    pub distance_to_support: Option<String>,
    pub nearest_resistance: Option<Decimal>,
    pub distance_to_resistance: Option<String>,
}
