//! Scripted provider for tests
//!
//! Records every call and answers from per-address scripts.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::provider::{ProviderClient, ProviderError, ProviderResult};
use crate::domain::{BasicInfo, ListedToken, ProviderKind, TokenInfo};

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    BasicInfo(String),
    FullInfo(String),
    RecentListings(u32),
    HolderCount(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Provider double that answers from configured scripts.
///
/// Unknown addresses answer `Ok(None)`. Queued full-info results are
/// consumed before the per-address default.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    kind: ProviderKind,
    full: Arc<Mutex<HashMap<String, ProviderResult<Option<TokenInfo>>>>>,
    queued_full: Arc<Mutex<HashMap<String, VecDeque<ProviderResult<Option<TokenInfo>>>>>>,
    basic: Arc<Mutex<HashMap<String, ProviderResult<Option<BasicInfo>>>>>,
    holders: Arc<Mutex<HashMap<String, u64>>>,
    listings: Option<Vec<ListedToken>>,
    failure: Option<ProviderError>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            full: Arc::default(),
            queued_full: Arc::default(),
            basic: Arc::default(),
            holders: Arc::default(),
            listings: None,
            failure: None,
            delay: None,
            calls: Arc::default(),
        }
    }

    /// Provider whose every call fails with `error`
    pub fn failing(kind: ProviderKind, error: ProviderError) -> Self {
        let mut provider = Self::new(kind);
        provider.failure = Some(error);
        provider
    }

    /// Builder method to answer full-info lookups for `info.address`
    pub fn with_full_info(self, info: TokenInfo) -> Self {
        lock(&self.full).insert(info.address.clone(), Ok(Some(info)));
        self
    }

    pub fn with_full_result(
        self,
        address: &str,
        result: ProviderResult<Option<TokenInfo>>,
    ) -> Self {
        lock(&self.full).insert(address.to_string(), result);
        self
    }

    /// Builder method to answer the next full-info lookup once, before the default
    pub fn with_queued_full_result(
        self,
        address: &str,
        result: ProviderResult<Option<TokenInfo>>,
    ) -> Self {
        lock(&self.queued_full)
            .entry(address.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn with_basic_info(self, address: &str, info: BasicInfo) -> Self {
        lock(&self.basic).insert(address.to_string(), Ok(Some(info)));
        self
    }

    pub fn with_basic_result(
        self,
        address: &str,
        result: ProviderResult<Option<BasicInfo>>,
    ) -> Self {
        lock(&self.basic).insert(address.to_string(), result);
        self
    }

    pub fn with_holder_count(self, address: &str, holders: u64) -> Self {
        lock(&self.holders).insert(address.to_string(), holders);
        self
    }

    /// Builder method enabling the listings feed
    pub fn with_listings(mut self, listings: Vec<ListedToken>) -> Self {
        self.listings = Some(listings);
        self
    }

    /// Builder method adding latency to every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.calls).clone()
    }

    pub fn full_info_calls(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, ProviderCall::FullInfo(_)))
            .count()
    }

    async fn enter(&self, call: ProviderCall) -> ProviderResult<()> {
        lock(&self.calls).push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn basic_info(&self, address: &str) -> ProviderResult<Option<BasicInfo>> {
        self.enter(ProviderCall::BasicInfo(address.to_string())).await?;
        lock(&self.basic).get(address).cloned().unwrap_or(Ok(None))
    }

    async fn full_info(&self, address: &str) -> ProviderResult<Option<TokenInfo>> {
        self.enter(ProviderCall::FullInfo(address.to_string())).await?;
        let queued = lock(&self.queued_full)
            .get_mut(address)
            .and_then(|queue| queue.pop_front());
        match queued {
            Some(result) => result,
            None => lock(&self.full).get(address).cloned().unwrap_or(Ok(None)),
        }
    }

    async fn recent_listings(&self, window_hours: u32) -> ProviderResult<Vec<ListedToken>> {
        self.enter(ProviderCall::RecentListings(window_hours)).await?;
        match &self.listings {
            Some(listings) => Ok(listings.clone()),
            None => Err(ProviderError::Unsupported(format!("{} has no listings feed", self.kind))),
        }
    }

    async fn holder_count(&self, address: &str) -> ProviderResult<Option<u64>> {
        self.enter(ProviderCall::HolderCount(address.to_string())).await?;
        Ok(lock(&self.holders).get(address).copied())
    }

    fn supports_listings(&self) -> bool {
        self.listings.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketFigures;

    fn info(address: &str, price: f64) -> TokenInfo {
        TokenInfo {
            address: address.to_string(),
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            decimals: 6,
            icon: None,
            figures: MarketFigures { price, ..Default::default() },
            source: ProviderKind::Birdeye,
        }
    }

    #[tokio::test]
    async fn test_scripted_provider_records_calls() {
        let provider = ScriptedProvider::new(ProviderKind::Birdeye).with_full_info(info("A", 1.0));

        let result = provider.full_info("A").await;
        assert_eq!(result, Ok(Some(info("A", 1.0))));
        assert_eq!(provider.full_info("B").await, Ok(None));
        assert_eq!(
            provider.calls(),
            vec![ProviderCall::FullInfo("A".into()), ProviderCall::FullInfo("B".into())]
        );
    }

    #[tokio::test]
    async fn test_queued_results_come_first() {
        let provider = ScriptedProvider::new(ProviderKind::Solscan)
            .with_full_info(info("A", 2.0))
            .with_queued_full_result("A", Err(ProviderError::RateLimited));

        assert_eq!(provider.full_info("A").await, Err(ProviderError::RateLimited));
        assert_eq!(provider.full_info("A").await, Ok(Some(info("A", 2.0))));
        assert_eq!(provider.full_info_calls(), 2);
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let provider = ScriptedProvider::failing(ProviderKind::Helius, ProviderError::Timeout);
        assert_eq!(provider.holder_count("A").await, Err(ProviderError::Timeout));
        assert!(!provider.supports_listings());
    }
}
