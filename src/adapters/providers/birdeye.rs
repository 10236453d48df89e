//! Birdeye Client
//!
//! Token overview, price, metadata and new-listing feeds from the Birdeye
//! public API. Requires an API key sent as `X-API-KEY`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use super::http::{build_client, non_empty, send_json};
use crate::domain::{
    BasicInfo, ListedToken, MarketFigures, ProviderKind, TokenInfo, DEFAULT_DECIMALS,
};
use crate::ports::{ProviderClient, ProviderError, ProviderResult};

pub const BIRDEYE_API_URL: &str = "https://public-api.birdeye.so";

#[derive(Debug, Clone)]
pub struct BirdeyeConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Page size for the new-listing feed
    pub listing_limit: u32,
}

impl Default for BirdeyeConfig {
    fn default() -> Self {
        Self {
            base_url: BIRDEYE_API_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
            listing_limit: 50,
        }
    }
}

impl BirdeyeConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }
}

/// `{ "success": bool, "data": ... }` wrapper used by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Option<T> {
        if self.success {
            self.data
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OverviewData {
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<u8>,
    #[serde(rename = "logoURI")]
    logo_uri: Option<String>,
    price: Option<f64>,
    #[serde(rename = "priceChange24hPercent")]
    price_change_24h: Option<f64>,
    mc: Option<f64>,
    #[serde(rename = "marketCap")]
    market_cap: Option<f64>,
    #[serde(rename = "v24hUSD")]
    volume_24h_usd: Option<f64>,
    liquidity: Option<f64>,
    holder: Option<f64>,
    #[serde(rename = "trade24h")]
    trade_24h: Option<f64>,
    fdv: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PriceData {
    value: Option<f64>,
    #[serde(rename = "priceChange24h")]
    price_change_24h: Option<f64>,
    liquidity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MetaData {
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<u8>,
    logo_uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NewListingData {
    #[serde(default)]
    items: Vec<NewListingItem>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NewListingItem {
    address: String,
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<u8>,
    #[serde(rename = "logoURI")]
    logo_uri: Option<String>,
    liquidity: Option<f64>,
    price: Option<f64>,
    mc: Option<f64>,
    #[serde(rename = "v24hUSD")]
    volume_24h_usd: Option<f64>,
    /// Unix seconds
    listing_time: Option<i64>,
}

fn num(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn count(value: Option<f64>) -> u64 {
    num(value).max(0.0) as u64
}

pub(crate) fn parse_overview(address: &str, data: OverviewData) -> TokenInfo {
    TokenInfo {
        address: address.to_string(),
        name: data.name.unwrap_or_default(),
        symbol: data.symbol.unwrap_or_default(),
        decimals: data.decimals.unwrap_or(DEFAULT_DECIMALS),
        icon: non_empty(data.logo_uri),
        figures: MarketFigures {
            price: num(data.price),
            price_change_24h: num(data.price_change_24h),
            market_cap: num(data.mc.or(data.market_cap)),
            volume_24h: num(data.volume_24h_usd),
            liquidity: num(data.liquidity),
            holder_count: count(data.holder),
            tx_count_24h: count(data.trade_24h),
            fdv: num(data.fdv),
        },
        source: ProviderKind::Birdeye,
    }
}

/// Pricing-only result used when the overview is unavailable
pub(crate) fn parse_price(address: &str, data: PriceData) -> Option<TokenInfo> {
    let price = num(data.value);
    if price <= 0.0 {
        return None;
    }
    Some(TokenInfo {
        address: address.to_string(),
        name: String::new(),
        symbol: String::new(),
        decimals: DEFAULT_DECIMALS,
        icon: None,
        figures: MarketFigures {
            price,
            price_change_24h: num(data.price_change_24h),
            liquidity: num(data.liquidity),
            ..Default::default()
        },
        source: ProviderKind::Birdeye,
    })
}

pub(crate) fn parse_meta(data: MetaData) -> Option<BasicInfo> {
    let name = data.name.unwrap_or_default();
    let symbol = data.symbol.unwrap_or_default();
    if name.is_empty() && symbol.is_empty() {
        return None;
    }
    Some(BasicInfo {
        name,
        symbol,
        icon: non_empty(data.logo_uri),
        decimals: data.decimals,
    })
}

pub(crate) fn parse_listings(
    data: NewListingData,
    window_hours: u32,
    now: DateTime<Utc>,
) -> Vec<ListedToken> {
    let cutoff = now - chrono::Duration::hours(i64::from(window_hours));

    data.items
        .into_iter()
        .filter_map(|item| {
            let listed_at = DateTime::from_timestamp(item.listing_time?, 0)?;
            if listed_at < cutoff || item.address.is_empty() {
                return None;
            }
            Some(ListedToken {
                address: item.address,
                name: item.name.unwrap_or_default(),
                symbol: item.symbol.unwrap_or_default(),
                decimals: item.decimals.unwrap_or(DEFAULT_DECIMALS),
                icon: non_empty(item.logo_uri),
                listed_at,
                figures: MarketFigures {
                    price: num(item.price),
                    market_cap: num(item.mc),
                    volume_24h: num(item.volume_24h_usd),
                    liquidity: num(item.liquidity),
                    ..Default::default()
                },
                source: ProviderKind::Birdeye,
            })
        })
        .collect()
}

/// Client for the Birdeye public API
#[derive(Debug, Clone)]
pub struct BirdeyeClient {
    config: BirdeyeConfig,
    http: Client,
}

impl BirdeyeClient {
    pub fn new(api_key: impl Into<String>) -> ProviderResult<Self> {
        Self::with_config(BirdeyeConfig::with_api_key(api_key))
    }

    pub fn with_config(config: BirdeyeConfig) -> ProviderResult<Self> {
        if config.api_key.is_empty() {
            return Err(ProviderError::Unauthorized("Birdeye API key is empty".into()));
        }
        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.config.base_url, path))
            .header("X-API-KEY", &self.config.api_key)
            .header("x-chain", "solana")
            .header("accept", "application/json")
    }

    async fn overview(&self, address: &str) -> ProviderResult<Option<OverviewData>> {
        let request = self.get("/defi/token_overview").query(&[("address", address)]);
        let envelope: Option<Envelope<OverviewData>> = send_json(request).await?;
        Ok(envelope.and_then(Envelope::into_data))
    }

    async fn price(&self, address: &str) -> ProviderResult<Option<PriceData>> {
        let request = self
            .get("/defi/price")
            .query(&[("address", address), ("include_liquidity", "true")]);
        let envelope: Option<Envelope<PriceData>> = send_json(request).await?;
        Ok(envelope.and_then(Envelope::into_data))
    }
}

#[async_trait]
impl ProviderClient for BirdeyeClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Birdeye
    }

    async fn basic_info(&self, address: &str) -> ProviderResult<Option<BasicInfo>> {
        let request = self
            .get("/defi/v3/token/meta-data/single")
            .query(&[("address", address)]);
        let envelope: Option<Envelope<MetaData>> = send_json(request).await?;
        Ok(envelope.and_then(Envelope::into_data).and_then(parse_meta))
    }

    async fn full_info(&self, address: &str) -> ProviderResult<Option<TokenInfo>> {
        if let Some(data) = self.overview(address).await? {
            return Ok(Some(parse_overview(address, data)));
        }

        tracing::debug!(address = %address, "Birdeye overview empty, falling back to price");
        Ok(self
            .price(address)
            .await?
            .and_then(|data| parse_price(address, data)))
    }

    async fn recent_listings(&self, window_hours: u32) -> ProviderResult<Vec<ListedToken>> {
        let limit = self.config.listing_limit.to_string();
        let request = self.get("/defi/v2/tokens/new_listing").query(&[
            ("limit", limit.as_str()),
            ("meme_platform_enabled", "false"),
        ]);
        let envelope: Option<Envelope<NewListingData>> = send_json(request).await?;

        match envelope.and_then(Envelope::into_data) {
            Some(data) => {
                let listings = parse_listings(data, window_hours, Utc::now());
                tracing::info!(
                    "Birdeye returned {} listings within {}h",
                    listings.len(),
                    window_hours
                );
                Ok(listings)
            }
            None => {
                tracing::warn!("Birdeye new_listing returned no data");
                Ok(Vec::new())
            }
        }
    }

    async fn holder_count(&self, address: &str) -> ProviderResult<Option<u64>> {
        Ok(self
            .overview(address)
            .await?
            .map(|data| count(data.holder))
            .filter(|holders| *holders > 0))
    }

    fn supports_listings(&self) -> bool {
        true
    }
}
