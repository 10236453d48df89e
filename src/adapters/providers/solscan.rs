//! Solscan Client
//!
//! Solscan Pro v2 token price and metadata. Full info joins both endpoints;
//! the price endpoint has answered both as an object and as a daily series,
//! so it is read leniently.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;

use super::http::{build_client, non_empty, send_json};
use crate::domain::{BasicInfo, MarketFigures, ProviderKind, TokenInfo, DEFAULT_DECIMALS};
use crate::ports::{ProviderClient, ProviderError, ProviderResult};

pub const SOLSCAN_API_URL: &str = "https://pro-api.solscan.io/v2.0";

#[derive(Debug, Clone)]
pub struct SolscanConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for SolscanConfig {
    fn default() -> Self {
        Self {
            base_url: SOLSCAN_API_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Option<T> {
        match self.success {
            Some(false) => None,
            _ => self.data,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenMeta {
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<u8>,
    icon: Option<String>,
    holder: Option<f64>,
    price: Option<f64>,
    market_cap: Option<f64>,
    volume_24h: Option<f64>,
}

/// Price quote extracted from either response shape
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct PriceQuote {
    price: f64,
    price_change_24h: f64,
    liquidity: f64,
}

fn field(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Object form `{price, price_change_24h, liquidity}` or a series whose
/// last entry carries `price`
pub(crate) fn parse_price(data: &Value) -> Option<PriceQuote> {
    let entry = match data {
        Value::Array(series) => series.last()?,
        Value::Object(_) => data,
        _ => return None,
    };
    let quote = PriceQuote {
        price: field(entry, "price"),
        price_change_24h: field(entry, "price_change_24h"),
        liquidity: field(entry, "liquidity"),
    };
    (quote.price > 0.0).then_some(quote)
}

pub(crate) fn merge_full_info(
    address: &str,
    price: Option<PriceQuote>,
    meta: Option<TokenMeta>,
) -> Option<TokenInfo> {
    if price.is_none() && meta.is_none() {
        return None;
    }
    let meta = meta.unwrap_or_default();
    let price = price.unwrap_or_default();

    Some(TokenInfo {
        address: address.to_string(),
        name: meta.name.unwrap_or_default(),
        symbol: meta.symbol.unwrap_or_default(),
        decimals: meta.decimals.unwrap_or(DEFAULT_DECIMALS),
        icon: non_empty(meta.icon),
        figures: MarketFigures {
            price: if price.price > 0.0 { price.price } else { meta.price.unwrap_or(0.0) },
            price_change_24h: price.price_change_24h,
            market_cap: meta.market_cap.unwrap_or(0.0),
            volume_24h: meta.volume_24h.unwrap_or(0.0),
            liquidity: price.liquidity,
            holder_count: meta.holder.unwrap_or(0.0).max(0.0) as u64,
            tx_count_24h: 0,
            fdv: 0.0,
        },
        source: ProviderKind::Solscan,
    })
}

/// Client for the Solscan Pro API
#[derive(Debug, Clone)]
pub struct SolscanClient {
    config: SolscanConfig,
    http: Client,
}

impl SolscanClient {
    pub fn new(api_key: impl Into<String>) -> ProviderResult<Self> {
        Self::with_config(SolscanConfig {
            api_key: api_key.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: SolscanConfig) -> ProviderResult<Self> {
        if config.api_key.is_empty() {
            return Err(ProviderError::Unauthorized("Solscan API key is empty".into()));
        }
        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    fn get(&self, path: &str, address: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.config.base_url, path))
            .header("token", &self.config.api_key)
            .header("accept", "application/json")
            .query(&[("address", address)])
    }

    async fn meta(&self, address: &str) -> ProviderResult<Option<TokenMeta>> {
        let envelope: Option<Envelope<TokenMeta>> =
            send_json(self.get("/token/meta", address)).await?;
        Ok(envelope.and_then(Envelope::into_data))
    }

    async fn price(&self, address: &str) -> ProviderResult<Option<PriceQuote>> {
        let envelope: Option<Envelope<Value>> = send_json(self.get("/token/price", address)).await?;
        Ok(envelope
            .and_then(Envelope::into_data)
            .and_then(|data| parse_price(&data)))
    }
}

#[async_trait]
impl ProviderClient for SolscanClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Solscan
    }

    async fn basic_info(&self, address: &str) -> ProviderResult<Option<BasicInfo>> {
        Ok(self.meta(address).await?.and_then(|meta| {
            let name = meta.name.unwrap_or_default();
            let symbol = meta.symbol.unwrap_or_default();
            if name.is_empty() && symbol.is_empty() {
                return None;
            }
            Some(BasicInfo {
                name,
                symbol,
                icon: non_empty(meta.icon),
                decimals: meta.decimals,
            })
        }))
    }

    async fn full_info(&self, address: &str) -> ProviderResult<Option<TokenInfo>> {
        let (price, meta) = tokio::join!(self.price(address), self.meta(address));

        // one endpoint failing is tolerated as long as the other answered
        let (price, meta) = match (price, meta) {
            (Err(e), Err(_)) => return Err(e),
            (price, meta) => (price.unwrap_or(None), meta.unwrap_or(None)),
        };

        Ok(merge_full_info(address, price, meta))
    }

    async fn holder_count(&self, address: &str) -> ProviderResult<Option<u64>> {
        Ok(self
            .meta(address)
            .await?
            .and_then(|meta| meta.holder)
            .map(|h| h.max(0.0) as u64)
            .filter(|h| *h > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_requires_key() {
        assert!(SolscanClient::new("").is_err());
        assert!(SolscanClient::new("key").is_ok());
    }

    #[test]
    fn test_parse_price_object_and_series() {
        let object = json!({ "price": 0.25, "price_change_24h": 3.0, "liquidity": 5000.0 });
        let quote = parse_price(&object).unwrap();
        assert_eq!(quote.price, 0.25);
        assert_eq!(quote.liquidity, 5000.0);

        let series = json!([
            { "date": 20240101, "price": 0.1 },
            { "date": 20240102, "price": 0.2 }
        ]);
        assert_eq!(parse_price(&series).unwrap().price, 0.2);

        assert!(parse_price(&json!([])).is_none());
        assert!(parse_price(&json!({ "price": 0 })).is_none());
    }

    #[test]
    fn test_merge_full_info() {
        let meta: TokenMeta = serde_json::from_value(json!({
            "name": "Giga Chad",
            "symbol": "GIGA",
            "decimals": 6,
            "icon": "https://img.example/giga.png",
            "holder": 3120,
            "market_cap": 880000.0
        }))
        .unwrap();
        let quote = parse_price(&json!({ "price": 0.01 }));

        let info = merge_full_info("MINT", quote, Some(meta)).unwrap();
        assert_eq!(info.symbol, "GIGA");
        assert_eq!(info.figures.price, 0.01);
        assert_eq!(info.figures.market_cap, 880000.0);
        assert_eq!(info.figures.holder_count, 3120);
        assert_eq!(info.source, ProviderKind::Solscan);

        assert!(merge_full_info("MINT", None, None).is_none());
    }
}
