//! Helius Client
//!
//! DAS JSON-RPC: `getAsset` for identity and `getTokenAccounts` for holder
//! totals. Market figures are limited to the DAS price hint, so full-info
//! lookups without one come back all-zero.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::http::{build_client, non_empty, send_json};
use crate::domain::{BasicInfo, MarketFigures, ProviderKind, TokenInfo, DEFAULT_DECIMALS};
use crate::ports::{ProviderClient, ProviderError, ProviderResult};

pub const HELIUS_RPC_URL: &str = "https://mainnet.helius-rpc.com";

#[derive(Debug, Clone)]
pub struct HeliusConfig {
    pub rpc_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for HeliusConfig {
    fn default() -> Self {
        Self {
            rpc_url: HELIUS_RPC_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Asset {
    content: Option<AssetContent>,
    token_info: Option<AssetTokenInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AssetContent {
    metadata: Option<AssetMetadata>,
    #[serde(default)]
    files: Vec<AssetFile>,
    links: Option<AssetLinks>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AssetMetadata {
    name: Option<String>,
    symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AssetFile {
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AssetLinks {
    image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AssetTokenInfo {
    decimals: Option<u8>,
    price_info: Option<PriceInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PriceInfo {
    price_per_token: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenAccounts {
    total: Option<u64>,
}

/// Unwrap a JSON-RPC response; "not found" errors become `Ok(None)`
pub(crate) fn into_result<T>(response: RpcResponse<T>) -> ProviderResult<Option<T>> {
    if let Some(error) = response.error {
        if error.message.to_ascii_lowercase().contains("not found") {
            return Ok(None);
        }
        return Err(ProviderError::Unavailable(format!(
            "RPC error {}: {}",
            error.code, error.message
        )));
    }
    Ok(response.result)
}

pub(crate) fn parse_asset(address: &str, asset: Asset) -> Option<TokenInfo> {
    let content = asset.content.unwrap_or_default();
    let metadata = content.metadata.unwrap_or_default();
    let name = metadata.name.unwrap_or_default();
    let symbol = metadata.symbol.unwrap_or_default();
    if name.is_empty() && symbol.is_empty() {
        return None;
    }

    let icon = content
        .files
        .into_iter()
        .find_map(|f| non_empty(f.uri))
        .or_else(|| non_empty(content.links.and_then(|l| l.image)));
    let token_info = asset.token_info.unwrap_or_default();
    let price = token_info
        .price_info
        .and_then(|p| p.price_per_token)
        .unwrap_or(0.0);

    Some(TokenInfo {
        address: address.to_string(),
        name,
        symbol,
        decimals: token_info.decimals.unwrap_or(DEFAULT_DECIMALS),
        icon,
        figures: MarketFigures {
            price,
            ..Default::default()
        },
        source: ProviderKind::Helius,
    })
}

/// Client for Helius DAS RPC
#[derive(Debug, Clone)]
pub struct HeliusClient {
    config: HeliusConfig,
    http: Client,
}

impl HeliusClient {
    pub fn new(api_key: impl Into<String>) -> ProviderResult<Self> {
        Self::with_config(HeliusConfig {
            api_key: api_key.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: HeliusConfig) -> ProviderResult<Self> {
        if config.api_key.is_empty() {
            return Err(ProviderError::Unauthorized("Helius API key is empty".into()));
        }
        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    async fn rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> ProviderResult<Option<T>> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "trend-hunter",
            "method": method,
            "params": params
        });
        let request = self
            .http
            .post(&self.config.rpc_url)
            .query(&[("api-key", self.config.api_key.as_str())])
            .json(&body);

        match send_json::<RpcResponse<T>>(request).await? {
            Some(response) => into_result(response),
            None => Ok(None),
        }
    }

    async fn asset(&self, address: &str) -> ProviderResult<Option<TokenInfo>> {
        let asset: Option<Asset> = self.rpc("getAsset", json!({ "id": address })).await?;
        Ok(asset.and_then(|a| parse_asset(address, a)))
    }
}

#[async_trait]
impl ProviderClient for HeliusClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Helius
    }

    async fn basic_info(&self, address: &str) -> ProviderResult<Option<BasicInfo>> {
        Ok(self.asset(address).await?.map(|info| info.basic()))
    }

    async fn full_info(&self, address: &str) -> ProviderResult<Option<TokenInfo>> {
        let mut info = match self.asset(address).await? {
            Some(info) => info,
            None => return Ok(None),
        };
        if let Some(holders) = self.holder_count(address).await? {
            info.figures.holder_count = holders;
        }
        Ok(Some(info))
    }

    async fn holder_count(&self, address: &str) -> ProviderResult<Option<u64>> {
        let accounts: Option<TokenAccounts> = self
            .rpc("getTokenAccounts", json!({ "mint": address, "limit": 1, "page": 1 }))
            .await?;
        Ok(accounts.and_then(|a| a.total).filter(|total| *total > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_key() {
        assert!(HeliusClient::new("").is_err());
        assert!(HeliusClient::new("key").is_ok());
    }

    #[test]
    fn test_parse_asset() {
        let response: RpcResponse<Asset> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {
                "interface": "FungibleToken",
                "content": {
                    "metadata": { "name": "Bonk Inu", "symbol": "BINU" },
                    "files": [ { "uri": "" }, { "uri": "https://img.example/binu.png" } ],
                    "links": { "image": "https://img.example/fallback.png" }
                },
                "token_info": { "decimals": 5, "price_info": { "price_per_token": 0.0003 } }
            }
        }))
        .unwrap();

        let asset = into_result(response).unwrap().unwrap();
        let info = parse_asset("MINT", asset).unwrap();
        assert_eq!(info.name, "Bonk Inu");
        assert_eq!(info.decimals, 5);
        assert_eq!(info.icon.as_deref(), Some("https://img.example/binu.png"));
        assert_eq!(info.figures.price, 0.0003);
    }

    #[test]
    fn test_parse_asset_falls_back_to_link_image() {
        let asset: Asset = serde_json::from_value(json!({
            "content": {
                "metadata": { "name": "Frog", "symbol": "FRG" },
                "links": { "image": "https://img.example/frog.png" }
            }
        }))
        .unwrap();
        let info = parse_asset("MINT", asset).unwrap();
        assert_eq!(info.icon.as_deref(), Some("https://img.example/frog.png"));
        assert!(info.figures.is_all_zero());
    }

    #[test]
    fn test_rpc_errors() {
        let not_found: RpcResponse<Asset> = serde_json::from_value(json!({
            "error": { "code": -32000, "message": "Asset Not Found" }
        }))
        .unwrap();
        assert!(matches!(into_result(not_found), Ok(None)));

        let failure: RpcResponse<Asset> = serde_json::from_value(json!({
            "error": { "code": -32603, "message": "internal" }
        }))
        .unwrap();
        assert!(matches!(into_result(failure), Err(ProviderError::Unavailable(_))));
    }
}
