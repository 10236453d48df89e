//! DexScreener Client
//!
//! Keyless pair data. A token's figures come from its most liquid pair;
//! recent listings come from the search endpoint filtered by pair age.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::http::{build_client, non_empty, send_json};
use crate::domain::{
    BasicInfo, ListedToken, MarketFigures, ProviderKind, TokenInfo, DEFAULT_DECIMALS,
};
use crate::ports::{ProviderClient, ProviderResult};

pub const DEXSCREENER_API_URL: &str = "https://api.dexscreener.com";

const SOLANA_CHAIN_ID: &str = "solana";

#[derive(Debug, Clone)]
pub struct DexScreenerConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Query sent to the search endpoint for new listings
    pub listing_query: String,
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: DEXSCREENER_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            listing_query: SOLANA_CHAIN_ID.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Pair {
    chain_id: Option<String>,
    #[serde(default)]
    base_token: PairToken,
    price_usd: Option<String>,
    liquidity: Option<UsdAmount>,
    market_cap: Option<f64>,
    fdv: Option<f64>,
    volume: Option<Window24h>,
    price_change: Option<Window24h>,
    txns: Option<Txns>,
    info: Option<PairInfo>,
    /// Unix milliseconds
    pair_created_at: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PairToken {
    #[serde(default)]
    address: String,
    name: Option<String>,
    symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UsdAmount {
    usd: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Window24h {
    h24: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Txns {
    h24: Option<TxnCount>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TxnCount {
    #[serde(default)]
    buys: u64,
    #[serde(default)]
    sells: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PairInfo {
    image_url: Option<String>,
}

impl Pair {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    fn figures(&self) -> MarketFigures {
        MarketFigures {
            price: self
                .price_usd
                .as_deref()
                .and_then(|p| p.parse::<f64>().ok())
                .unwrap_or(0.0),
            price_change_24h: self.price_change.as_ref().and_then(|w| w.h24).unwrap_or(0.0),
            market_cap: self.market_cap.unwrap_or(0.0),
            volume_24h: self.volume.as_ref().and_then(|w| w.h24).unwrap_or(0.0),
            liquidity: self.liquidity_usd(),
            holder_count: 0,
            tx_count_24h: self
                .txns
                .as_ref()
                .and_then(|t| t.h24.as_ref())
                .map_or(0, |c| c.buys + c.sells),
            fdv: self.fdv.unwrap_or(0.0),
        }
    }

    fn icon(&self) -> Option<String> {
        non_empty(self.info.as_ref().and_then(|i| i.image_url.clone()))
    }
}

/// Most liquid pair whose base token is `address`
pub(crate) fn best_pair<'a>(pairs: &'a [Pair], address: &str) -> Option<&'a Pair> {
    pairs
        .iter()
        .filter(|p| p.base_token.address == address)
        .max_by(|a, b| a.liquidity_usd().total_cmp(&b.liquidity_usd()))
}

pub(crate) fn parse_token(address: &str, response: PairsResponse) -> Option<TokenInfo> {
    let pairs = response.pairs.unwrap_or_default();
    let pair = best_pair(&pairs, address)?;

    Some(TokenInfo {
        address: address.to_string(),
        name: pair.base_token.name.clone().unwrap_or_default(),
        symbol: pair.base_token.symbol.clone().unwrap_or_default(),
        decimals: DEFAULT_DECIMALS,
        icon: pair.icon(),
        figures: pair.figures(),
        source: ProviderKind::DexScreener,
    })
}

pub(crate) fn parse_listings(
    response: PairsResponse,
    window_hours: u32,
    now: DateTime<Utc>,
) -> Vec<ListedToken> {
    let cutoff = now - chrono::Duration::hours(i64::from(window_hours));
    let mut seen = HashSet::new();

    response
        .pairs
        .unwrap_or_default()
        .into_iter()
        .filter(|p| p.chain_id.as_deref() == Some(SOLANA_CHAIN_ID))
        .filter_map(|pair| {
            let listed_at = DateTime::from_timestamp_millis(pair.pair_created_at?)?;
            if listed_at < cutoff || !seen.insert(pair.base_token.address.clone()) {
                return None;
            }
            Some(ListedToken {
                address: pair.base_token.address.clone(),
                name: pair.base_token.name.clone().unwrap_or_default(),
                symbol: pair.base_token.symbol.clone().unwrap_or_default(),
                decimals: DEFAULT_DECIMALS,
                icon: pair.icon(),
                listed_at,
                figures: pair.figures(),
                source: ProviderKind::DexScreener,
            })
        })
        .collect()
}

/// Client for the DexScreener public API
#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    config: DexScreenerConfig,
    http: Client,
}

impl DexScreenerClient {
    pub fn new() -> ProviderResult<Self> {
        Self::with_config(DexScreenerConfig::default())
    }

    pub fn with_config(config: DexScreenerConfig) -> ProviderResult<Self> {
        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    async fn token_pairs(&self, address: &str) -> ProviderResult<Option<PairsResponse>> {
        let url = format!("{}/latest/dex/tokens/{}", self.config.base_url, address);
        send_json(self.http.get(url)).await
    }
}

#[async_trait]
impl ProviderClient for DexScreenerClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DexScreener
    }

    async fn basic_info(&self, address: &str) -> ProviderResult<Option<BasicInfo>> {
        Ok(self.full_info(address).await?.map(|info| info.basic()))
    }

    async fn full_info(&self, address: &str) -> ProviderResult<Option<TokenInfo>> {
        Ok(self
            .token_pairs(address)
            .await?
            .and_then(|response| parse_token(address, response)))
    }

    async fn recent_listings(&self, window_hours: u32) -> ProviderResult<Vec<ListedToken>> {
        let url = format!("{}/latest/dex/search", self.config.base_url);
        let request = self.http.get(url).query(&[("q", self.config.listing_query.as_str())]);
        let response: Option<PairsResponse> = send_json(request).await?;

        let listings = response
            .map(|r| parse_listings(r, window_hours, Utc::now()))
            .unwrap_or_default();
        tracing::info!("DexScreener returned {} listings within {}h", listings.len(), window_hours);
        Ok(listings)
    }

    async fn holder_count(&self, _address: &str) -> ProviderResult<Option<u64>> {
        Ok(None)
    }

    fn supports_listings(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS_JSON: &str = r#"{
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "chainId": "solana",
                "pairAddress": "P1",
                "baseToken": { "address": "MINT", "name": "Moon Frog", "symbol": "MFROG" },
                "priceUsd": "0.00042",
                "liquidity": { "usd": 1200.5 },
                "marketCap": 42000,
                "fdv": 50000,
                "volume": { "h24": 3100.0 },
                "priceChange": { "h24": 12.5 },
                "txns": { "h24": { "buys": 40, "sells": 15 } },
                "pairCreatedAt": 1700000000000
            },
            {
                "chainId": "solana",
                "pairAddress": "P2",
                "baseToken": { "address": "MINT", "name": "Moon Frog", "symbol": "MFROG" },
                "priceUsd": "0.00043",
                "liquidity": { "usd": 90000.0 },
                "marketCap": 43000,
                "info": { "imageUrl": "https://img.example/mfrog.png" },
                "pairCreatedAt": 1700000100000
            },
            {
                "chainId": "solana",
                "pairAddress": "P3",
                "baseToken": { "address": "OTHER", "name": "Other", "symbol": "OTH" },
                "liquidity": { "usd": 999999.0 }
            }
        ]
    }"#;

    #[test]
    fn test_parse_token_picks_most_liquid_pair() {
        let response: PairsResponse = serde_json::from_str(PAIRS_JSON).unwrap();
        let info = parse_token("MINT", response).unwrap();

        assert_eq!(info.symbol, "MFROG");
        assert_eq!(info.figures.liquidity, 90000.0);
        assert_eq!(info.figures.price, 0.00043);
        assert_eq!(info.icon.as_deref(), Some("https://img.example/mfrog.png"));
        assert_eq!(info.source, ProviderKind::DexScreener);
    }

    #[test]
    fn test_parse_token_without_pairs() {
        let response: PairsResponse = serde_json::from_str(r#"{ "pairs": null }"#).unwrap();
        assert!(parse_token("MINT", response).is_none());
    }

    #[test]
    fn test_pair_figures() {
        let response: PairsResponse = serde_json::from_str(PAIRS_JSON).unwrap();
        let pairs = response.pairs.unwrap();
        let figures = pairs[0].figures();
        assert_eq!(figures.tx_count_24h, 55);
        assert_eq!(figures.price_change_24h, 12.5);
        assert_eq!(figures.volume_24h, 3100.0);
    }

    #[test]
    fn test_parse_listings_window_and_dedupe() {
        let response: PairsResponse = serde_json::from_str(PAIRS_JSON).unwrap();
        let created = DateTime::from_timestamp_millis(1700000100000).unwrap();

        let listings = parse_listings(response, 6, created + chrono::Duration::hours(1));
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].address, "MINT");

        let response: PairsResponse = serde_json::from_str(PAIRS_JSON).unwrap();
        let listings = parse_listings(response, 6, created + chrono::Duration::hours(12));
        assert!(listings.is_empty());
    }
}
