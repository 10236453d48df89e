//! In-Memory Token Store
//!
//! `TokenStore` over a single `RwLock`ed state, with optional JSON
//! persistence so a restarted process keeps its tracked tokens and topics.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::{
    normalize_topic_name, IdentityUpdate, MarketSnapshot, NewToken, NewTopic, TokenId, TokenRecord,
    Topic, TopicId, TopicMember, TopicUpdate,
};
use crate::ports::{StoreError, StoreResult, TokenStore};

/// Default persistence file name
pub const DEFAULT_STORE_FILE: &str = "trend_hunter_state.json";

/// Everything the store holds, in its on-disk shape
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PersistedState {
    next_token_id: u64,
    next_topic_id: u64,
    tokens: BTreeMap<u64, TokenRecord>,
    /// Append-only, per token, in insertion order
    snapshots: BTreeMap<u64, Vec<MarketSnapshot>>,
    topics: BTreeMap<u64, Topic>,
    members: Vec<TopicMember>,
    #[serde(skip)]
    by_address: HashMap<String, TokenId>,
}

impl PersistedState {
    fn rebuild_index(&mut self) {
        self.by_address = self
            .tokens
            .values()
            .map(|t| (t.address.clone(), t.id))
            .collect();
    }

    fn latest(&self, id: TokenId) -> Option<&MarketSnapshot> {
        self.snapshots
            .get(&id.0)?
            .iter()
            .max_by_key(|s| s.observed_at)
    }

    fn topic_by_name(&self, name: &str) -> Option<&Topic> {
        let normalized = normalize_topic_name(name);
        self.topics.values().find(|t| t.name == normalized)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<PersistedState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load state from disk; a missing or empty file yields an empty store
    pub fn load_from(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let mut state: PersistedState = serde_json::from_str(&content)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        state.rebuild_index();

        tracing::info!(
            "Store loaded from {}: {} tokens, {} topics",
            path.display(),
            state.tokens.len(),
            state.topics.len()
        );

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Write state to disk via a temp file and rename
    pub async fn save_to(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = {
            let state = self.state.read().await;
            serde_json::to_string_pretty(&*state)
                .map_err(|e| StoreError::Serialization(e.to_string()))?
        };

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;

        tracing::info!("Store saved to {}", path.display());
        Ok(())
    }

    pub async fn token_count(&self) -> usize {
        self.state.read().await.tokens.len()
    }

    pub async fn snapshot_count(&self) -> usize {
        self.state.read().await.snapshots.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn find_token(&self, address: &str) -> StoreResult<Option<TokenRecord>> {
        let state = self.state.read().await;
        Ok(state
            .by_address
            .get(address)
            .and_then(|id| state.tokens.get(&id.0))
            .cloned())
    }

    async fn get_token(&self, id: TokenId) -> StoreResult<Option<TokenRecord>> {
        Ok(self.state.read().await.tokens.get(&id.0).cloned())
    }

    async fn create_token(&self, token: NewToken) -> StoreResult<TokenRecord> {
        let mut state = self.state.write().await;

        if let Some(existing) = state
            .by_address
            .get(&token.address)
            .and_then(|id| state.tokens.get(&id.0))
        {
            return Ok(existing.clone());
        }

        state.next_token_id += 1;
        let record = TokenRecord {
            id: TokenId(state.next_token_id),
            address: token.address,
            name: token.name,
            symbol: token.symbol,
            decimals: token.decimals,
            icon: token.icon,
            created_at: token.created_at,
        };
        state.by_address.insert(record.address.clone(), record.id);
        state.tokens.insert(record.id.0, record.clone());
        Ok(record)
    }

    async fn update_token_identity(
        &self,
        id: TokenId,
        update: IdentityUpdate,
    ) -> StoreResult<TokenRecord> {
        let mut state = self.state.write().await;
        let token = state.tokens.get_mut(&id.0).ok_or(StoreError::TokenNotFound(id))?;
        token.name = update.name;
        token.symbol = update.symbol;
        token.icon = Some(update.icon);
        Ok(token.clone())
    }

    async fn append_market_snapshot(
        &self,
        snapshot: MarketSnapshot,
    ) -> StoreResult<MarketSnapshot> {
        let mut state = self.state.write().await;
        if !state.tokens.contains_key(&snapshot.token_id.0) {
            return Err(StoreError::TokenNotFound(snapshot.token_id));
        }

        let history = state.snapshots.entry(snapshot.token_id.0).or_default();
        if let Some(existing) = history.iter().find(|s| **s == snapshot) {
            return Ok(existing.clone());
        }
        history.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn latest_snapshot(&self, id: TokenId) -> StoreResult<Option<MarketSnapshot>> {
        Ok(self.state.read().await.latest(id).cloned())
    }

    async fn snapshot_history(&self, id: TokenId) -> StoreResult<Vec<MarketSnapshot>> {
        Ok(self
            .state
            .read()
            .await
            .snapshots
            .get(&id.0)
            .cloned()
            .unwrap_or_default())
    }

    async fn tracked_tokens(&self) -> StoreResult<Vec<(TokenRecord, MarketSnapshot)>> {
        let state = self.state.read().await;
        Ok(state
            .tokens
            .values()
            .filter_map(|token| state.latest(token.id).map(|s| (token.clone(), s.clone())))
            .collect())
    }

    async fn find_topic_by_name(&self, name: &str) -> StoreResult<Option<Topic>> {
        Ok(self.state.read().await.topic_by_name(name).cloned())
    }

    async fn create_topic(&self, topic: NewTopic) -> StoreResult<Topic> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.topic_by_name(&topic.name) {
            return Ok(existing.clone());
        }

        state.next_topic_id += 1;
        let now = Utc::now();
        let created = Topic {
            id: TopicId(state.next_topic_id),
            name: normalize_topic_name(&topic.name),
            description: topic.description,
            keywords: topic.keywords,
            hotness: topic.hotness,
            created_at: now,
            updated_at: now,
        };
        state.topics.insert(created.id.0, created.clone());
        Ok(created)
    }

    async fn update_topic(&self, id: TopicId, update: TopicUpdate) -> StoreResult<Topic> {
        let mut state = self.state.write().await;
        let topic = state.topics.get_mut(&id.0).ok_or(StoreError::TopicNotFound(id))?;
        topic.keywords = update.keywords;
        topic.hotness = update.hotness;
        topic.updated_at = Utc::now();
        Ok(topic.clone())
    }

    async fn add_member_to_topic(&self, topic_id: TopicId, token_id: TokenId) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.topics.contains_key(&topic_id.0) {
            return Err(StoreError::TopicNotFound(topic_id));
        }
        if !state.tokens.contains_key(&token_id.0) {
            return Err(StoreError::TokenNotFound(token_id));
        }
        if state
            .members
            .iter()
            .any(|m| m.topic_id == topic_id && m.token_id == token_id)
        {
            return Ok(false);
        }

        state.members.push(TopicMember {
            topic_id,
            token_id,
            added_at: Utc::now(),
        });
        Ok(true)
    }

    async fn topic_members(&self, topic_id: TopicId) -> StoreResult<Vec<TokenRecord>> {
        let state = self.state.read().await;
        Ok(state
            .members
            .iter()
            .filter(|m| m.topic_id == topic_id)
            .filter_map(|m| state.tokens.get(&m.token_id.0).cloned())
            .collect())
    }

    async fn list_topics(&self) -> StoreResult<Vec<Topic>> {
        let mut topics: Vec<Topic> = self.state.read().await.topics.values().cloned().collect();
        topics.sort_by(|a, b| b.hotness.total_cmp(&a.hotness));
        Ok(topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketFigures, ProviderKind};
    use chrono::Duration;
    use tempfile::TempDir;

    fn new_token(seed: u8, name: &str) -> NewToken {
        NewToken {
            address: bs58::encode([seed; 32]).into_string(),
            name: name.to_string(),
            symbol: name.to_uppercase(),
            decimals: 9,
            icon: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_token_is_idempotent() {
        let store = InMemoryStore::new();
        let first = store.create_token(new_token(1, "cat")).await.unwrap();
        let again = store.create_token(new_token(1, "different")).await.unwrap();

        assert_eq!(first, again);
        assert_eq!(store.token_count().await, 1);
        assert_eq!(store.find_token(&first.address).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_snapshots_append_and_latest_by_timestamp() {
        let store = InMemoryStore::new();
        let token = store.create_token(new_token(2, "frog")).await.unwrap();
        let now = Utc::now();

        let priced = |price| MarketFigures {
            price,
            ..Default::default()
        };
        let newer =
            MarketSnapshot::new(token.id, priced(2.0), ProviderKind::Birdeye).observed_at(now);
        let older = MarketSnapshot::new(token.id, priced(1.0), ProviderKind::Birdeye)
            .observed_at(now - Duration::minutes(5));

        store.append_market_snapshot(newer.clone()).await.unwrap();
        store.append_market_snapshot(older.clone()).await.unwrap();
        // exact repeat is ignored
        store.append_market_snapshot(older).await.unwrap();

        assert_eq!(store.snapshot_count().await, 2);
        assert_eq!(store.latest_snapshot(token.id).await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn test_snapshot_for_unknown_token_is_rejected() {
        let store = InMemoryStore::new();
        let snapshot =
            MarketSnapshot::new(TokenId(99), MarketFigures::default(), ProviderKind::Helius);
        let result = store.append_market_snapshot(snapshot).await;
        assert!(matches!(result, Err(StoreError::TokenNotFound(TokenId(99)))));
    }

    #[tokio::test]
    async fn test_tracked_tokens_require_snapshot() {
        let store = InMemoryStore::new();
        let tracked = store.create_token(new_token(3, "moon")).await.unwrap();
        store.create_token(new_token(4, "dust")).await.unwrap();
        store
            .append_market_snapshot(MarketSnapshot::new(
                tracked.id,
                MarketFigures::default(),
                ProviderKind::Solscan,
            ))
            .await
            .unwrap();

        let tokens = store.tracked_tokens().await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].0.id, tracked.id);
    }

    #[tokio::test]
    async fn test_topic_create_and_membership_are_idempotent() {
        let store = InMemoryStore::new();
        let token = store.create_token(new_token(5, "pepe")).await.unwrap();

        let topic = store
            .create_topic(NewTopic::new("Pepe", vec!["pepe".into()], 1.0))
            .await
            .unwrap();
        let again = store.create_topic(NewTopic::new("  PEPE ", vec![], 2.0)).await.unwrap();
        assert_eq!(topic.id, again.id);

        assert!(store.add_member_to_topic(topic.id, token.id).await.unwrap());
        assert!(!store.add_member_to_topic(topic.id, token.id).await.unwrap());
        assert_eq!(store.topic_members(topic.id).await.unwrap().len(), 1);
        assert_eq!(store.find_topic_by_name("pepe").await.unwrap().map(|t| t.id), Some(topic.id));
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join(DEFAULT_STORE_FILE);

        let store = InMemoryStore::new();
        let token = store.create_token(new_token(6, "bonk")).await.unwrap();
        store
            .append_market_snapshot(MarketSnapshot::new(
                token.id,
                MarketFigures {
                    liquidity: 5.0,
                    ..Default::default()
                },
                ProviderKind::DexScreener,
            ))
            .await
            .unwrap();
        let topic = store
            .create_topic(NewTopic::new("bonk", vec!["bonk".into()], 3.0))
            .await
            .unwrap();
        store.add_member_to_topic(topic.id, token.id).await.unwrap();
        tokio_test::assert_ok!(store.save_to(&path).await);

        let loaded = InMemoryStore::load_from(&path).unwrap();
        assert_eq!(loaded.find_token(&token.address).await.unwrap(), Some(token.clone()));
        assert_eq!(loaded.tracked_tokens().await.unwrap().len(), 1);
        assert_eq!(loaded.topic_members(topic.id).await.unwrap(), vec![token]);

        // ids continue after reload
        let next = loaded.create_token(new_token(7, "wif")).await.unwrap();
        assert_eq!(next.id, TokenId(2));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let store = InMemoryStore::load_from(Path::new("/nonexistent/state.json")).unwrap();
        assert!(store.state.try_read().unwrap().tokens.is_empty());
    }
}
