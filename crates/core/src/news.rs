//! News and sentiment value objects.

use serde::{Deserialize, Serialize};

/// Direction a headline leans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
    Unknown,
}

/// Where a sentiment value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentSource {
    /// Derived from provider vote counts.
    Votes,
    /// Keyword heuristic applied locally; treat as a rough signal only.
    Estimated,
    Unknown,
}

/// One news headline for an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub sentiment: Sentiment,
    pub sentiment_source: SentimentSource,
}

/// The news tool's normalized output: newest headlines for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsDigest {
    pub symbol: String,
    pub items: Vec<NewsItem>,
}

impl NewsDigest {
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            items: Vec::new(),
        }
    }

    pub fn headlines(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.title.as_str()).collect()
    }
}
