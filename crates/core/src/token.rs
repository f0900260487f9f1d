//! Token identity value objects: profiles and disambiguation candidates.

use serde::{Deserialize, Serialize};

/// Minimal identity card for a listed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenProfile {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coin_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,
}

/// A market returned by asset search, used to resolve a symbol or name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetMatch {
    pub coin_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,
}

/// A token reference inside a DEX pool candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolToken {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// One disambiguation choice offered when an asset reference cannot be
/// resolved to a single market. Exists only within the request/response
/// pair that offers it; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexCandidate {
    /// Pool id in `{network}_{address}` form; echoed back as a selection.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity_usd: Option<f64>,
    pub base_token: PoolToken,
    pub quote_token: PoolToken,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_omits_empty_fields() {
        let c = DexCandidate {
            id: "solana_0xabc".into(),
            network: Some("solana".into()),
            address: None,
            name: None,
            dex: None,
            liquidity_usd: None,
            base_token: PoolToken {
                name: None,
                symbol: Some("PEPE".into()),
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
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("solana_0xabc"));
        assert!(!json.contains("liquidity_usd"));
        assert!(!json.contains("pool_url"));
    }
}
