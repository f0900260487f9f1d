//! GeckoTerminal client — DEX pool search and lookup.
//!
//! Used for tokens that never resolve on the main listing: the search
//! path produces disambiguation candidates, the lookup path researches
//! a pool the caller selected.

use crate::cache::TtlCache;
use crate::http::HttpFetcher;
use coinsage_core::error::{ToolErrorKind, ToolFailure};
use coinsage_core::market::PoolStats;
use coinsage_core::token::{DexCandidate, PoolToken};
use std::collections::HashMap;
use std::time::Duration;

/// Generic words that carry no signal when matching pool names.
const STOPWORDS: &[&str] = &["coin", "token", "crypto", "sol", "eth", "btc", "usdc", "usdt"];

pub struct GeckoTerminalClient {
    http: HttpFetcher,
    base_url: String,
    cache: TtlCache<serde_json::Value>,
}

impl GeckoTerminalClient {
    pub fn new(http: HttpFetcher, base_url: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Search pools for a free-text query, scored by relevance.
    pub async fn search_pools(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<DexCandidate>, ToolFailure> {
        let q = query.trim();
        if q.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/search/pools", self.base_url);
        let cache_key = q.to_lowercase();
        let data = if let Some(hit) = self.cache.get("pool_search", &cache_key) {
            hit
        } else {
            let fetched = self
                .http
                .get_json(&url, &[("query", q), ("include", "base_token,quote_token,dex")])
                .await?;
            self.cache.set("pool_search", &cache_key, fetched.clone());
            fetched
        };

        let included = build_included_map(&data);
        let limit = limit.clamp(1, 20);

        let rows = data["data"].as_array().cloned().unwrap_or_default();
        let mut scored: Vec<(f64, DexCandidate)> = rows
            .iter()
            .take(limit)
            .filter_map(|row| parse_candidate(row, &included))
            .map(|c| (score_candidate(q, &c), c))
            .collect();

        // Score desc, liquidity desc as tiebreak.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.1.liquidity_usd
                        .unwrap_or(0.0)
                        .partial_cmp(&a.1.liquidity_usd.unwrap_or(0.0))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        Ok(scored.into_iter().take(limit).map(|(_, c)| c).collect())
    }

    /// Fetch a single pool by `{network}_{address}` id.
    pub async fn pool(&self, pool_id: &str) -> Result<PoolStats, ToolFailure> {
        let (network, address) = split_pool_id(pool_id)?;

        let url = format!("{}/networks/{}/pools/{}", self.base_url, network, address);
        let data = if let Some(hit) = self.cache.get("pool", pool_id) {
            hit
        } else {
            let fetched = self
                .http
                .get_json(&url, &[("include", "base_token,quote_token,dex")])
                .await?;
            self.cache.set("pool", pool_id, fetched.clone());
            fetched
        };

        let included = build_included_map(&data);
        let row = &data["data"];
        let attrs = &row["attributes"];
        let (base, _quote, dex_name) = relationships(row, &included);

        Ok(PoolStats {
            id: pool_id.to_string(),
            network: network.to_string(),
            address: address.to_string(),
            name: attrs["name"].as_str().map(String::from),
            dex: dex_name,
            liquidity_usd: number_field(&attrs["reserve_in_usd"]),
            price_usd: number_field(&attrs["base_token_price_usd"]),
            volume_usd_h24: number_field(&attrs["volume_usd"]["h24"]),
            pool_url: format!("https://www.geckoterminal.com/{network}/pools/{address}"),
            base_symbol: base.symbol,
            base_name: base.name,
            base_image_url: base.image_url,
        })
    }
}

/// Pool ids look like `{network}_{address}`, but network ids can contain
/// underscores (`polygon_pos_0x...`): the address is the last segment.
fn split_pool_id(pool_id: &str) -> Result<(&str, &str), ToolFailure> {
    let pid = pool_id.trim();
    match pid.rsplit_once('_') {
        Some((network, address)) if !network.is_empty() && !address.is_empty() => {
            Ok((network, address))
        }
        _ => Err(ToolFailure::new(
            ToolErrorKind::NotFound,
            format!("invalid pool id '{pool_id}', expected '{{network}}_{{address}}'"),
        )),
    }
}

/// JSON:API `included` entries keyed by `type:id`.
fn build_included_map(data: &serde_json::Value) -> HashMap<String, serde_json::Value> {
    data["included"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|inc| {
                    let t = inc["type"].as_str()?;
                    let i = inc["id"].as_str()?;
                    Some((format!("{t}:{i}"), inc.clone()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn token_of(included: &HashMap<String, serde_json::Value>, reference: &serde_json::Value) -> PoolToken {
    let attrs = reference["data"]["id"]
        .as_str()
        .and_then(|id| included.get(&format!("token:{id}")))
        .map(|inc| inc["attributes"].clone())
        .unwrap_or_default();

    PoolToken {
        name: attrs["name"].as_str().map(String::from),
        symbol: attrs["symbol"].as_str().map(String::from),
        address: attrs["address"].as_str().map(String::from),
        image_url: attrs["image_url"].as_str().map(String::from),
    }
}

fn relationships(
    row: &serde_json::Value,
    included: &HashMap<String, serde_json::Value>,
) -> (PoolToken, PoolToken, Option<String>) {
    let rel = &row["relationships"];
    let base = token_of(included, &rel["base_token"]);
    let quote = token_of(included, &rel["quote_token"]);
    let dex_name = rel["dex"]["data"]["id"]
        .as_str()
        .and_then(|id| included.get(&format!("dex:{id}")))
        .and_then(|inc| inc["attributes"]["name"].as_str().map(String::from))
        .or_else(|| rel["dex"]["data"]["id"].as_str().map(String::from));
    (base, quote, dex_name)
}

/// Providers return numbers as either strings or JSON numbers.
fn number_field(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn parse_candidate(
    row: &serde_json::Value,
    included: &HashMap<String, serde_json::Value>,
) -> Option<DexCandidate> {
    let pool_id = row["id"].as_str()?;
    let attrs = &row["attributes"];
    let (base, quote, dex_name) = relationships(row, included);

    let (network, address) = split_pool_id(pool_id).ok().unzip();

    let pool_url = match (network, address) {
        (Some(n), Some(a)) => Some(format!("https://www.geckoterminal.com/{n}/pools/{a}")),
        _ => None,
    };

    Some(DexCandidate {
        id: pool_id.to_string(),
        network: network.map(String::from),
        address: address
            .map(String::from)
            .or_else(|| attrs["address"].as_str().map(String::from)),
        name: attrs["name"].as_str().map(String::from),
        dex: dex_name,
        liquidity_usd: number_field(&attrs["reserve_in_usd"]),
        base_token: base,
        quote_token: quote,
        price_usd: number_field(&attrs["base_token_price_usd"]),
        pool_url,
    })
}

/// Relevance: query-token hits in the pool/base names dominate, name
/// similarity refines, liquidity nudges (saturating around $50k).
/// Candidates with query tokens but zero hits are penalized.
fn score_candidate(query: &str, candidate: &DexCandidate) -> f64 {
    let ql = query.to_lowercase();
    let q_tokens: Vec<&str> = ql
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .collect();

    let joined = format!(
        "{} {} {}",
        candidate.name.as_deref().unwrap_or_default(),
        candidate.base_token.name.as_deref().unwrap_or_default(),
        candidate.base_token.symbol.as_deref().unwrap_or_default(),
    )
    .to_lowercase();

    let token_hit = if q_tokens.is_empty() {
        0.0
    } else {
        q_tokens.iter().filter(|t| joined.contains(*t)).count() as f64 / q_tokens.len() as f64
    };

    let truncated: String = joined.chars().take(80).collect();
    let name_sim = if ql.is_empty() {
        0.0
    } else {
        strsim::normalized_levenshtein(&ql, &truncated)
    };

    let liq_score = candidate
        .liquidity_usd
        .filter(|l| *l > 0.0)
        .map(|l| (l / 50_000.0).min(1.0))
        .unwrap_or(0.0);

    let mut score = token_hit * 0.65 + name_sim * 0.25 + liq_score * 0.10;
    if !q_tokens.is_empty() && token_hit == 0.0 {
        score -= 0.35;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_id_splits_on_last_underscore() {
        let (network, address) = split_pool_id("polygon_pos_0xabc").unwrap();
        assert_eq!(network, "polygon_pos");
        assert_eq!(address, "0xabc");
    }

    #[test]
    fn bad_pool_id_is_not_found() {
        let err = split_pool_id("nounderscore").unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::NotFound);
        assert!(split_pool_id("_").is_err());
    }

    fn candidate(name: &str, symbol: &str, liquidity: Option<f64>) -> DexCandidate {
        DexCandidate {
            id: "sol_0x1".into(),
            network: Some("sol".into()),
            address: Some("0x1".into()),
            name: Some(name.into()),
            dex: None,
            liquidity_usd: liquidity,
            base_token: PoolToken {
                name: Some(name.into()),
                symbol: Some(symbol.into()),
                address: None,
                image_url: None,
            },
            quote_token: PoolToken {
                name: None,
                symbol: None,
                address: None,
                image_url: None,
            },
            price_usd: None,
            pool_url: None,
        }
    }

    #[test]
    fn matching_candidate_outscores_junk() {
        let hit = score_candidate("moonpup", &candidate("MoonPup / SOL", "MPUP", Some(80_000.0)));
        let miss = score_candidate("moonpup", &candidate("Banana / USDC", "BAN", Some(500_000.0)));
        assert!(hit > miss, "hit={hit} miss={miss}");
        assert!(miss < 0.0, "junk should be penalized below zero: {miss}");
    }

    #[test]
    fn liquidity_breaks_ties() {
        let rich = score_candidate("pup", &candidate("Pup", "PUP", Some(100_000.0)));
        let poor = score_candidate("pup", &candidate("Pup", "PUP", Some(1_000.0)));
        assert!(rich > poor);
    }

    #[test]
    fn stopwords_are_ignored_in_query() {
        // "coin" alone reduces to zero query tokens: no hit score, no penalty.
        let s = score_candidate("coin", &candidate("Anything", "ANY", None));
        assert!(s >= 0.0);
    }

    #[test]
    fn parse_candidate_reads_jsonapi_shape() {
        let data = serde_json::json!({
            "data": [{
                "id": "eth_0xdeadbeef",
                "attributes": {
                    "name": "PUP / WETH",
                    "reserve_in_usd": "12345.5",
                    "base_token_price_usd": "0.002"
                },
                "relationships": {
                    "base_token": { "data": { "id": "eth_0xpup", "type": "token" } },
                    "quote_token": { "data": { "id": "eth_0xweth", "type": "token" } },
                    "dex": { "data": { "id": "uniswap_v3", "type": "dex" } }
                }
            }],
            "included": [
                { "type": "token", "id": "eth_0xpup",
                  "attributes": { "name": "PupToken", "symbol": "PUP" } },
                { "type": "token", "id": "eth_0xweth",
                  "attributes": { "name": "Wrapped Ether", "symbol": "WETH" } },
                { "type": "dex", "id": "uniswap_v3",
                  "attributes": { "name": "Uniswap V3" } }
            ]
        });
        let included = build_included_map(&data);
        let row = &data["data"][0];
        let c = parse_candidate(row, &included).unwrap();
        assert_eq!(c.id, "eth_0xdeadbeef");
        assert_eq!(c.network.as_deref(), Some("eth"));
        assert_eq!(c.base_token.symbol.as_deref(), Some("PUP"));
        assert_eq!(c.dex.as_deref(), Some("Uniswap V3"));
        assert_eq!(c.liquidity_usd, Some(12345.5));
        assert_eq!(c.price_usd, Some(0.002));
        assert_eq!(
            c.pool_url.as_deref(),
            Some("https://www.geckoterminal.com/eth/pools/0xdeadbeef")
        );
    }
}
