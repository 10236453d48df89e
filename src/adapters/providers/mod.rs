//! Market-data provider adapters
//!
//! One `ProviderClient` per backend:
//! - DexScreener: keyless pair data and listings search
//! - Birdeye: overview, price, metadata and new listings
//! - Solscan: price and metadata
//! - Helius: DAS asset metadata and holder totals

pub mod http;
pub mod birdeye;
pub mod dexscreener;
pub mod solscan;
pub mod helius;

use std::sync::Arc;
use std::time::Duration;

pub use birdeye::{BirdeyeClient, BirdeyeConfig};
pub use dexscreener::{DexScreenerClient, DexScreenerConfig};
pub use helius::{HeliusClient, HeliusConfig};
pub use solscan::{SolscanClient, SolscanConfig};

use crate::config::ProvidersSection;
use crate::ports::{ProviderClient, ProviderResult};

/// Build every provider the configuration has credentials for.
///
/// DexScreener needs no key and is always present.
pub fn build_providers(section: &ProvidersSection) -> ProviderResult<Vec<Arc<dyn ProviderClient>>> {
    let timeout = Duration::from_millis(section.timeout_ms);
    let mut providers: Vec<Arc<dyn ProviderClient>> = Vec::new();

    providers.push(Arc::new(DexScreenerClient::with_config(DexScreenerConfig {
        base_url: section.dexscreener_url.clone(),
        timeout,
        ..Default::default()
    })?));

    match section.get_birdeye_api_key() {
        Some(api_key) => providers.push(Arc::new(BirdeyeClient::with_config(BirdeyeConfig {
            base_url: section.birdeye_url.clone(),
            api_key,
            timeout,
            listing_limit: section.listing_limit,
        })?)),
        None => tracing::warn!("BIRDEYE_API_KEY not set, Birdeye disabled"),
    }

    match section.get_solscan_api_key() {
        Some(api_key) => providers.push(Arc::new(SolscanClient::with_config(SolscanConfig {
            base_url: section.solscan_url.clone(),
            api_key,
            timeout,
        })?)),
        None => tracing::warn!("SOLSCAN_API_KEY not set, Solscan disabled"),
    }

    match section.get_helius_api_key() {
        Some(api_key) => providers.push(Arc::new(HeliusClient::with_config(HeliusConfig {
            rpc_url: section.helius_url.clone(),
            api_key,
            timeout,
        })?)),
        None => tracing::warn!("HELIUS_API_KEY not set, Helius disabled"),
    }

    Ok(providers)
}
