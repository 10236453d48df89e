//! Source Aggregator
//!
//! Owns the provider set and puts caching, round-robin selection, bounded
//! retry and fallback in front of it. Provider failures never escape: every
//! lookup resolves to a value or "not found".

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::cache::ResponseCache;
use crate::domain::{is_valid_address, BasicInfo, ListedToken, ProviderKind, TokenInfo};
use crate::ports::{ProviderClient, ProviderError, ProviderResult};

/// A name or a symbol; readings with neither carry no identity
fn has_identity(name: &str, symbol: &str) -> bool {
    !name.is_empty() || !symbol.is_empty()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// How long a lookup result is served from cache (ms)
    pub cache_ttl_ms: u64,
    pub cache_capacity: usize,
    /// Per-call deadline (ms)
    pub call_timeout_ms: u64,
    /// Pause before the single retry of a throttled or timed-out call (ms)
    pub retry_delay_ms: u64,
    /// Pause between `get_batch` waves (ms)
    pub wave_pause_ms: u64,
    /// Full-info fallback order after the rotation pick
    pub fallback_order: Vec<ProviderKind>,
    /// Order for basic-info and holder-count lookups
    pub basic_order: Vec<ProviderKind>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 1_000,
            cache_capacity: 10_000,
            call_timeout_ms: 10_000,
            retry_delay_ms: 2_000,
            wave_pause_ms: 100,
            fallback_order: ProviderKind::ALL.to_vec(),
            basic_order: ProviderKind::ALL.to_vec(),
        }
    }
}

impl AggregatorConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn wave_pause(&self) -> Duration {
        Duration::from_millis(self.wave_pause_ms)
    }
}

/// Outcome of walking a provider chain
enum Walk<T> {
    Found(T),
    /// Every provider failed, at least one of them answered
    Empty,
    /// Every provider errored
    Failed,
}

pub struct SourceAggregator {
    providers: Vec<Arc<dyn ProviderClient>>,
    config: AggregatorConfig,
    rotation: AtomicUsize,
    full_cache: RwLock<ResponseCache<String, Option<TokenInfo>>>,
    basic_cache: RwLock<ResponseCache<String, Option<BasicInfo>>>,
}

impl SourceAggregator {
    pub fn new(providers: Vec<Arc<dyn ProviderClient>>, config: AggregatorConfig) -> Self {
        let ttl = config.cache_ttl();
        let capacity = config.cache_capacity;
        Self {
            providers,
            config,
            rotation: AtomicUsize::new(0),
            full_cache: RwLock::new(ResponseCache::with_capacity(ttl, capacity)),
            basic_cache: RwLock::new(ResponseCache::with_capacity(ttl, capacity)),
        }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn provider_kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Name, symbol and icon, walking providers in basic-info order
    pub async fn get_basic_info(&self, address: &str) -> Option<BasicInfo> {
        if let Some(cached) = self.basic_cache.read().await.get(&address.to_string()) {
            tracing::debug!(address = %address, "basic info served from cache");
            return cached;
        }

        let order = self.ordered(&self.config.basic_order, None);
        let walk = self
            .walk(&order, "basic_info", |provider| async move {
                let info = provider.basic_info(address).await?;
                Ok(info.filter(|b| has_identity(&b.name, &b.symbol)))
            })
            .await;

        match walk {
            Walk::Found(info) => {
                self.basic_cache
                    .write()
                    .await
                    .insert(address.to_string(), Some(info.clone()));
                Some(info)
            }
            Walk::Empty => {
                self.basic_cache.write().await.insert(address.to_string(), None);
                None
            }
            Walk::Failed => None,
        }
    }

    /// Full info from the next provider in rotation, falling back in order.
    ///
    /// An all-zero reading counts as a miss for that provider. When every
    /// provider that answered gave one, the last all-zero reading is
    /// returned so callers can apply their own stale-reading policy.
    pub async fn get_full_info(&self, address: &str) -> Option<TokenInfo> {
        if let Some(cached) = self.full_cache.read().await.get(&address.to_string()) {
            tracing::debug!(address = %address, "full info served from cache");
            return cached;
        }
        if self.providers.is_empty() {
            return None;
        }

        let first = self.rotation.fetch_add(1, Ordering::Relaxed) % self.providers.len();
        let mut order = vec![first];
        order.extend(self.ordered(&self.config.fallback_order, Some(first)));

        let zero_reading: Mutex<Option<TokenInfo>> = Mutex::new(None);
        let walk = self
            .walk(&order, "full_info", |provider| {
                let zero_reading = &zero_reading;
                async move {
                    let info = provider.full_info(address).await?;
                    Ok(info.and_then(|i| {
                        if i.figures.is_all_zero() {
                            tracing::debug!(
                                provider = %i.source,
                                address = %address,
                                "all-zero reading, falling through"
                            );
                            *lock(zero_reading) = Some(i);
                            None
                        } else {
                            Some(i)
                        }
                    }))
                }
            })
            .await;

        let result = match walk {
            Walk::Found(info) => Some(info),
            Walk::Empty => zero_reading.into_inner().unwrap_or_else(PoisonError::into_inner),
            Walk::Failed => return None,
        };

        self.full_cache
            .write()
            .await
            .insert(address.to_string(), result.clone());
        if let Some(info) = result.as_ref().filter(|i| has_identity(&i.name, &i.symbol)) {
            self.basic_cache
                .write()
                .await
                .insert(address.to_string(), Some(info.basic()));
        }
        result
    }

    /// Full info for many addresses in waves of one call per provider
    pub async fn get_batch(&self, addresses: &[String]) -> Vec<TokenInfo> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = addresses.iter().filter(|a| seen.insert(a.as_str())).collect();
        let wave_size = self.providers.len().max(1);

        let mut results = Vec::with_capacity(unique.len());
        for (wave, chunk) in unique.chunks(wave_size).enumerate() {
            if wave > 0 {
                tokio::time::sleep(self.config.wave_pause()).await;
            }
            let wave_results =
                join_all(chunk.iter().map(|address| self.get_full_info(address))).await;
            results.extend(wave_results.into_iter().flatten());
        }

        tracing::debug!("Batch lookup: {}/{} resolved", results.len(), unique.len());
        results
    }

    /// Listings from every provider with a feed, inside the window, deduplicated
    pub async fn get_recent_listings(&self, window_hours: u32) -> Vec<ListedToken> {
        let feeds: Vec<&dyn ProviderClient> = self
            .providers
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| p.supports_listings())
            .collect();
        if feeds.is_empty() {
            tracing::warn!("No provider supports recent listings");
            return Vec::new();
        }

        let responses = join_all(feeds.into_iter().map(|provider| async move {
            let result = self
                .call_with_retry(provider, || provider.recent_listings(window_hours))
                .await;
            (provider.kind(), result)
        }))
        .await;

        let cutoff = Utc::now() - chrono::Duration::hours(i64::from(window_hours));
        let mut seen = HashSet::new();
        let mut listings = Vec::new();
        for (kind, result) in responses {
            let batch = match result {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(provider = %kind, "recent listings failed: {}", e);
                    continue;
                }
            };
            tracing::debug!(provider = %kind, "{} listings received", batch.len());

            for listed in batch {
                if !is_valid_address(&listed.address) {
                    tracing::debug!(
                        provider = %kind,
                        address = %listed.address,
                        "dropping malformed address"
                    );
                    continue;
                }
                if listed.listed_at < cutoff || !seen.insert(listed.address.clone()) {
                    continue;
                }
                listings.push(listed);
            }
        }

        listings.sort_by_key(|l| l.listed_at);
        listings
    }

    /// First non-zero holder count, walking providers in basic-info order
    pub async fn get_holder_count(&self, address: &str) -> Option<u64> {
        let order = self.ordered(&self.config.basic_order, None);
        let walk = self
            .walk(&order, "holder_count", |provider| async move {
                Ok(provider.holder_count(address).await?.filter(|n| *n > 0))
            })
            .await;
        match walk {
            Walk::Found(count) => Some(count),
            Walk::Empty | Walk::Failed => None,
        }
    }

    /// Provider indices in `order`, then any provider the order omits
    fn ordered(&self, order: &[ProviderKind], skip: Option<usize>) -> Vec<usize> {
        let mut indices = Vec::with_capacity(self.providers.len());
        for kind in order {
            for (i, provider) in self.providers.iter().enumerate() {
                if provider.kind() == *kind && Some(i) != skip && !indices.contains(&i) {
                    indices.push(i);
                }
            }
        }
        for i in 0..self.providers.len() {
            if Some(i) != skip && !indices.contains(&i) {
                indices.push(i);
            }
        }
        indices
    }

    async fn walk<'a, T, F, Fut>(&'a self, order: &[usize], operation: &str, call: F) -> Walk<T>
    where
        F: Fn(&'a dyn ProviderClient) -> Fut,
        Fut: Future<Output = ProviderResult<Option<T>>>,
    {
        let mut responded = false;
        for &index in order {
            let provider = self.providers[index].as_ref();
            match self.call_with_retry(provider, || call(provider)).await {
                Ok(Some(value)) => return Walk::Found(value),
                Ok(None) => {
                    tracing::debug!(provider = %provider.kind(), "{}: no data", operation);
                    responded = true;
                }
                Err(e) => {
                    tracing::warn!(provider = %provider.kind(), "{} failed: {}", operation, e);
                }
            }
        }
        if responded {
            Walk::Empty
        } else {
            Walk::Failed
        }
    }

    /// One call under the deadline, retried once when throttled or timed out
    async fn call_with_retry<T, F, Fut>(
        &self,
        provider: &dyn ProviderClient,
        call: F,
    ) -> ProviderResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        match self.call_once(call()).await {
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    provider = %provider.kind(),
                    "{}, retrying in {:?}",
                    e,
                    self.config.retry_delay()
                );
                tokio::time::sleep(self.config.retry_delay()).await;
                self.call_once(call()).await
            }
            other => other,
        }
    }

    async fn call_once<T, Fut>(&self, call: Fut) -> ProviderResult<T>
    where
        Fut: Future<Output = ProviderResult<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketFigures;
    use crate::ports::mocks::{ProviderCall, ScriptedProvider};

    fn address(seed: u8) -> String {
        bs58::encode([seed; 32]).into_string()
    }

    fn info(address: &str, source: ProviderKind, price: f64) -> TokenInfo {
        TokenInfo {
            address: address.to_string(),
            name: "Sol Cat".to_string(),
            symbol: "SCAT".to_string(),
            decimals: 6,
            icon: Some("https://img.example/scat.png".to_string()),
            figures: MarketFigures {
                price,
                liquidity: 1_000.0,
                ..Default::default()
            },
            source,
        }
    }

    fn fast_config() -> AggregatorConfig {
        AggregatorConfig {
            call_timeout_ms: 50,
            retry_delay_ms: 1,
            wave_pause_ms: 1,
            ..Default::default()
        }
    }

    fn no_cache() -> AggregatorConfig {
        AggregatorConfig {
            cache_ttl_ms: 0,
            ..fast_config()
        }
    }

    fn aggregator(providers: &[ScriptedProvider], config: AggregatorConfig) -> SourceAggregator {
        let providers: Vec<Arc<dyn ProviderClient>> = providers
            .iter()
            .map(|p| Arc::new(p.clone()) as Arc<dyn ProviderClient>)
            .collect();
        SourceAggregator::new(providers, config)
    }

    #[tokio::test]
    async fn test_repeat_lookup_within_ttl_hits_provider_once() {
        let addr = address(1);
        let dex = ScriptedProvider::new(ProviderKind::DexScreener)
            .with_full_info(info(&addr, ProviderKind::DexScreener, 0.5));
        let birdeye = ScriptedProvider::new(ProviderKind::Birdeye)
            .with_full_info(info(&addr, ProviderKind::Birdeye, 0.5));
        let agg = aggregator(&[dex.clone(), birdeye.clone()], fast_config());

        let first = agg.get_full_info(&addr).await;
        let second = agg.get_full_info(&addr).await;

        assert_eq!(first, second);
        assert_eq!(dex.full_info_calls() + birdeye.full_info_calls(), 1);
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_not_found() {
        let addr = address(2);
        let providers = [
            ScriptedProvider::failing(
                ProviderKind::DexScreener,
                ProviderError::Unavailable("down".into()),
            ),
            ScriptedProvider::failing(
                ProviderKind::Birdeye,
                ProviderError::Unauthorized("bad key".into()),
            ),
            ScriptedProvider::failing(ProviderKind::Solscan, ProviderError::Http("500".into())),
        ];
        let agg = aggregator(&providers, fast_config());

        assert_eq!(agg.get_full_info(&addr).await, None);
        // nothing responded, so nothing was cached
        assert_eq!(agg.get_full_info(&addr).await, None);
        assert_eq!(providers[0].full_info_calls(), 2);
    }

    #[tokio::test]
    async fn test_single_success_found_from_every_rotation_start() {
        let addr = address(3);
        let expected = info(&addr, ProviderKind::Solscan, 2.0);
        let providers = [
            ScriptedProvider::failing(
                ProviderKind::DexScreener,
                ProviderError::Unavailable("down".into()),
            ),
            ScriptedProvider::new(ProviderKind::Birdeye),
            ScriptedProvider::new(ProviderKind::Solscan).with_full_info(expected.clone()),
            ScriptedProvider::failing(ProviderKind::Helius, ProviderError::Timeout),
        ];
        let agg = aggregator(&providers, no_cache());

        for _ in 0..providers.len() {
            assert_eq!(agg.get_full_info(&addr).await, Some(expected.clone()));
        }
    }

    #[tokio::test]
    async fn test_rotation_spreads_first_calls() {
        let addr = address(4);
        let providers = [
            ScriptedProvider::new(ProviderKind::DexScreener)
                .with_full_info(info(&addr, ProviderKind::DexScreener, 1.0)),
            ScriptedProvider::new(ProviderKind::Birdeye)
                .with_full_info(info(&addr, ProviderKind::Birdeye, 1.0)),
            ScriptedProvider::new(ProviderKind::Solscan)
                .with_full_info(info(&addr, ProviderKind::Solscan, 1.0)),
        ];
        let agg = aggregator(&providers, no_cache());

        let mut sources = Vec::new();
        for _ in 0..3 {
            sources.push(agg.get_full_info(&addr).await.map(|i| i.source));
        }

        assert_eq!(
            sources,
            vec![
                Some(ProviderKind::DexScreener),
                Some(ProviderKind::Birdeye),
                Some(ProviderKind::Solscan),
            ]
        );
        for provider in &providers {
            assert_eq!(provider.full_info_calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_cache_hits_do_not_advance_rotation() {
        let a = address(5);
        let b = address(6);
        let dex = ScriptedProvider::new(ProviderKind::DexScreener)
            .with_full_info(info(&a, ProviderKind::DexScreener, 1.0))
            .with_full_info(info(&b, ProviderKind::DexScreener, 1.0));
        let birdeye = ScriptedProvider::new(ProviderKind::Birdeye)
            .with_full_info(info(&b, ProviderKind::Birdeye, 1.0));
        let agg = aggregator(&[dex, birdeye], fast_config());

        agg.get_full_info(&a).await;
        agg.get_full_info(&a).await;
        let second = agg.get_full_info(&b).await;

        assert_eq!(second.map(|i| i.source), Some(ProviderKind::Birdeye));
    }

    #[tokio::test]
    async fn test_all_zero_reading_falls_through() {
        let addr = address(7);
        let zero = TokenInfo {
            figures: MarketFigures::default(),
            ..info(&addr, ProviderKind::DexScreener, 0.0)
        };
        let dex = ScriptedProvider::new(ProviderKind::DexScreener).with_full_info(zero);
        let birdeye = ScriptedProvider::new(ProviderKind::Birdeye)
            .with_full_info(info(&addr, ProviderKind::Birdeye, 3.0));
        let agg = aggregator(&[dex, birdeye], fast_config());

        let result = agg.get_full_info(&addr).await;
        assert_eq!(result.map(|i| i.source), Some(ProviderKind::Birdeye));
    }

    #[tokio::test]
    async fn test_negative_result_cached_when_a_provider_responded() {
        let addr = address(8);
        let dex = ScriptedProvider::new(ProviderKind::DexScreener);
        let birdeye = ScriptedProvider::failing(
            ProviderKind::Birdeye,
            ProviderError::Unavailable("down".into()),
        );
        let agg = aggregator(&[dex.clone(), birdeye], fast_config());

        assert_eq!(agg.get_full_info(&addr).await, None);
        assert_eq!(agg.get_full_info(&addr).await, None);
        assert_eq!(dex.full_info_calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_call_is_retried_once() {
        let addr = address(9);
        let dex = ScriptedProvider::new(ProviderKind::DexScreener)
            .with_queued_full_result(&addr, Err(ProviderError::RateLimited))
            .with_full_info(info(&addr, ProviderKind::DexScreener, 1.5));
        let agg = aggregator(&[dex.clone()], fast_config());

        let result = agg.get_full_info(&addr).await;
        assert_eq!(result.map(|i| i.figures.price), Some(1.5));
        assert_eq!(dex.full_info_calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_retried_then_falls_back() {
        let addr = address(10);
        let slow = ScriptedProvider::new(ProviderKind::DexScreener)
            .with_full_info(info(&addr, ProviderKind::DexScreener, 1.0))
            .with_delay(Duration::from_millis(200));
        let birdeye = ScriptedProvider::new(ProviderKind::Birdeye)
            .with_full_info(info(&addr, ProviderKind::Birdeye, 2.0));
        let agg = aggregator(&[slow.clone(), birdeye], fast_config());

        let result = agg.get_full_info(&addr).await;
        assert_eq!(result.map(|i| i.source), Some(ProviderKind::Birdeye));
        assert_eq!(slow.full_info_calls(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let addr = address(11);
        let dex = ScriptedProvider::failing(
            ProviderKind::DexScreener,
            ProviderError::Unauthorized("key".into()),
        );
        let agg = aggregator(&[dex.clone()], fast_config());

        assert_eq!(agg.get_full_info(&addr).await, None);
        assert_eq!(dex.full_info_calls(), 1);
    }

    #[tokio::test]
    async fn test_full_info_seeds_basic_cache() {
        let addr = address(12);
        let dex = ScriptedProvider::new(ProviderKind::DexScreener)
            .with_full_info(info(&addr, ProviderKind::DexScreener, 1.0));
        let agg = aggregator(&[dex.clone()], fast_config());

        agg.get_full_info(&addr).await;
        let basic = agg.get_basic_info(&addr).await;

        assert_eq!(basic.map(|b| b.symbol), Some("SCAT".to_string()));
        assert!(!dex.calls().contains(&ProviderCall::BasicInfo(addr.clone())));
    }

    #[tokio::test]
    async fn test_nameless_full_info_leaves_basic_lookup_to_providers() {
        let addr = address(15);
        let price_only = TokenInfo {
            name: String::new(),
            symbol: String::new(),
            icon: None,
            ..info(&addr, ProviderKind::Birdeye, 0.25)
        };
        let birdeye = ScriptedProvider::new(ProviderKind::Birdeye).with_full_info(price_only);
        let dex = ScriptedProvider::new(ProviderKind::DexScreener).with_basic_info(
            &addr,
            BasicInfo {
                name: "Frog".into(),
                symbol: "FRG".into(),
                icon: None,
                decimals: Some(6),
            },
        );
        let agg = aggregator(&[birdeye, dex.clone()], fast_config());

        let full = agg.get_full_info(&addr).await;
        assert_eq!(full.map(|i| i.figures.price), Some(0.25));

        let basic = agg.get_basic_info(&addr).await;
        assert_eq!(basic.map(|b| b.symbol), Some("FRG".to_string()));
        assert!(dex.calls().contains(&ProviderCall::BasicInfo(addr.clone())));
    }

    #[tokio::test]
    async fn test_all_zero_from_every_responder_returns_the_reading() {
        let addr = address(16);
        let zero = TokenInfo {
            figures: MarketFigures::default(),
            ..info(&addr, ProviderKind::DexScreener, 0.0)
        };
        let dex = ScriptedProvider::new(ProviderKind::DexScreener).with_full_info(zero);
        let birdeye = ScriptedProvider::failing(
            ProviderKind::Birdeye,
            ProviderError::Unavailable("down".into()),
        );
        let agg = aggregator(&[dex.clone(), birdeye], fast_config());

        let result = agg.get_full_info(&addr).await;
        assert!(result.as_ref().map_or(false, |i| i.figures.is_all_zero()));
        assert_eq!(result.map(|i| i.source), Some(ProviderKind::DexScreener));

        // cached like any other answer
        agg.get_full_info(&addr).await;
        assert_eq!(dex.full_info_calls(), 1);
    }

    #[tokio::test]
    async fn test_basic_info_follows_configured_order() {
        let addr = address(13);
        let basic = BasicInfo {
            name: "Frog".into(),
            symbol: "FRG".into(),
            icon: None,
            decimals: Some(6),
        };
        let dex = ScriptedProvider::new(ProviderKind::DexScreener);
        let helius =
            ScriptedProvider::new(ProviderKind::Helius).with_basic_info(&addr, basic.clone());
        let config = AggregatorConfig {
            basic_order: vec![ProviderKind::Helius, ProviderKind::DexScreener],
            ..fast_config()
        };
        let agg = aggregator(&[dex.clone(), helius], config);

        assert_eq!(agg.get_basic_info(&addr).await, Some(basic));
        assert!(dex.calls().is_empty());
    }

    #[tokio::test]
    async fn test_batch_resolves_across_waves() {
        let addresses: Vec<String> = (20..25).map(address).collect();
        let mut dex = ScriptedProvider::new(ProviderKind::DexScreener);
        let mut birdeye = ScriptedProvider::new(ProviderKind::Birdeye);
        for addr in &addresses[..4] {
            dex = dex.with_full_info(info(addr, ProviderKind::DexScreener, 1.0));
            birdeye = birdeye.with_full_info(info(addr, ProviderKind::Birdeye, 1.0));
        }
        let agg = aggregator(&[dex.clone(), birdeye.clone()], fast_config());

        let mut input = addresses.clone();
        input.push(addresses[0].clone());
        let results = agg.get_batch(&input).await;

        assert_eq!(results.len(), 4);
        // fifth address: unknown everywhere, one call per provider
        assert_eq!(dex.full_info_calls() + birdeye.full_info_calls(), 4 + 2);
    }

    #[tokio::test]
    async fn test_recent_listings_filter_and_dedupe() {
        let now = Utc::now();
        let listed = |seed: u8, hours_ago: i64, source: ProviderKind| ListedToken {
            address: address(seed),
            name: format!("Token {}", seed),
            symbol: format!("T{}", seed),
            decimals: 9,
            icon: None,
            listed_at: now - chrono::Duration::hours(hours_ago),
            figures: MarketFigures::default(),
            source,
        };
        let mut malformed = listed(33, 1, ProviderKind::DexScreener);
        malformed.address = "not-an-address".into();

        let dex = ScriptedProvider::new(ProviderKind::DexScreener).with_listings(vec![
            listed(30, 1, ProviderKind::DexScreener),
            listed(31, 10, ProviderKind::DexScreener),
            malformed,
        ]);
        let birdeye = ScriptedProvider::new(ProviderKind::Birdeye).with_listings(vec![
            listed(30, 1, ProviderKind::Birdeye),
            listed(32, 2, ProviderKind::Birdeye),
        ]);
        let helius = ScriptedProvider::new(ProviderKind::Helius);
        let agg = aggregator(&[dex, birdeye, helius.clone()], fast_config());

        let listings = agg.get_recent_listings(6).await;
        let addresses: Vec<&str> = listings.iter().map(|l| l.address.as_str()).collect();

        assert_eq!(addresses, vec![address(32).as_str(), address(30).as_str()]);
        assert!(helius.calls().is_empty());
    }

    #[tokio::test]
    async fn test_holder_count_skips_providers_without_one() {
        let addr = address(40);
        let dex = ScriptedProvider::new(ProviderKind::DexScreener);
        let helius = ScriptedProvider::new(ProviderKind::Helius).with_holder_count(&addr, 1_234);
        let agg = aggregator(&[dex, helius], fast_config());

        assert_eq!(agg.get_holder_count(&addr).await, Some(1_234));
        assert_eq!(agg.get_holder_count(&address(41)).await, None);
    }
}
