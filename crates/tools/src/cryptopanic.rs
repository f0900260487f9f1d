//! CryptoPanic client — latest headlines with sentiment.
//!
//! News is an optional signal: a missing credential surfaces as an
//! Unauthorized failure that the dispatcher degrades into a failed
//! observation, never blocking the rest of the pipeline.

use crate::cache::TtlCache;
use crate::http::HttpFetcher;
use coinsage_core::error::{ToolErrorKind, ToolFailure};
use coinsage_core::news::{NewsDigest, NewsItem, Sentiment, SentimentSource};
use std::time::Duration;

const BULLISH_KEYWORDS: &[&str] = &[
    "surge",
    "rally",
    "breakout",
    "approval",
    "inflows",
    "record",
    "launch",
    "partnership",
    "adoption",
    "wins",
    "settlement",
];

const BEARISH_KEYWORDS: &[&str] = &[
    "hack",
    "exploit",
    "ban",
    "lawsuit",
    "charges",
    "sell-off",
    "plunge",
    "crash",
    "liquidation",
    "downgrade",
    "outflows",
];

pub struct CryptoPanicClient {
    http: HttpFetcher,
    base_url: String,
    api_key: Option<String>,
    cache: TtlCache<NewsDigest>,
}

impl CryptoPanicClient {
    pub fn new(
        http: HttpFetcher,
        base_url: impl Into<String>,
        api_key: Option<String>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Latest headlines for a symbol: newest 5 plus up to 2 extra
    /// high-signal (bullish/bearish) items further down the feed.
    pub async fn latest_news(&self, symbol: &str) -> Result<NewsDigest, ToolFailure> {
        let symbol = symbol.trim().to_uppercase();

        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ToolFailure::new(
                ToolErrorKind::Unauthorized,
                "news credential not configured (CRYPTOPANIC_API_KEY)",
            ));
        };

        if let Some(hit) = self.cache.get("news", &symbol) {
            return Ok(hit);
        }

        let url = format!("{}/posts/", self.base_url);
        let data = self
            .http
            .get_json(
                &url,
                &[
                    ("auth_token", api_key),
                    ("currencies", &symbol),
                    ("public", "true"),
                    ("kind", "news"),
                ],
            )
            .await?;

        let results = data["results"].as_array().cloned().unwrap_or_default();
        let all: Vec<NewsItem> = results.iter().take(20).filter_map(parse_item).collect();

        // Newest 5, then backfill with strongly-signed items up to 7.
        let mut items: Vec<NewsItem> = all.iter().take(5).cloned().collect();
        for item in all.iter().skip(5) {
            if items.len() >= 7 {
                break;
            }
            if matches!(item.sentiment, Sentiment::Bullish | Sentiment::Bearish) {
                items.push(item.clone());
            }
        }

        let digest = NewsDigest {
            symbol: symbol.clone(),
            items,
        };
        self.cache.set("news", &symbol, digest.clone());
        Ok(digest)
    }
}

fn parse_item(raw: &serde_json::Value) -> Option<NewsItem> {
    let title = raw["title"].as_str()?.to_string();
    let description = raw["description"].as_str().unwrap_or_default();

    // Prefer the original article, fall back to the aggregator post page,
    // reconstructing it from id + slug when the list endpoint omits urls.
    let url = raw["original_url"]
        .as_str()
        .or_else(|| raw["url"].as_str())
        .map(String::from)
        .or_else(|| {
            let id = raw["id"].as_u64()?;
            let slug = raw["slug"].as_str()?;
            Some(format!("https://cryptopanic.com/news/{id}/{slug}"))
        });

    let domain = raw["source"]["domain"]
        .as_str()
        .map(String::from)
        .or_else(|| url.as_deref().and_then(domain_of));

    let published_at = raw["published_at"]
        .as_str()
        .or_else(|| raw["created_at"].as_str())
        .map(String::from);

    let votes = &raw["votes"];
    let bullish = votes["bullish"].as_u64();
    let bearish = votes["bearish"].as_u64();

    let (sentiment, sentiment_source) = match (bullish, bearish) {
        (None, None) => (
            estimate_sentiment(&title, description),
            SentimentSource::Estimated,
        ),
        (b, br) => {
            let b = b.unwrap_or(0);
            let br = br.unwrap_or(0);
            let s = if b >= br {
                Sentiment::Bullish
            } else {
                Sentiment::Bearish
            };
            (s, SentimentSource::Votes)
        }
    };

    Some(NewsItem {
        title,
        url,
        domain,
        published_at,
        sentiment,
        sentiment_source,
    })
}

fn domain_of(url: &str) -> Option<String> {
    let rest = url.split("://").nth(1)?;
    let host = rest.split('/').next()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then(|| host.to_string())
}

/// Keyword heuristic for when provider votes are unavailable.
/// Bearish keywords win ties; callers see the source as `estimated`.
fn estimate_sentiment(title: &str, description: &str) -> Sentiment {
    let text = format!("{title} {description}").to_lowercase();
    if BEARISH_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Sentiment::Bearish;
    }
    if BULLISH_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Sentiment::Bullish;
    }
    Sentiment::Neutral
}
