use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    IdentityUpdate, MarketSnapshot, NewToken, NewTopic, TokenId, TokenRecord, Topic, TopicId,
    TopicUpdate,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token not found: {0}")]
    TokenNotFound(TokenId),

    #[error("Topic not found: {0}")]
    TopicNotFound(TopicId),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence boundary for tokens, snapshots and topics.
///
/// Every write is idempotent under retry:
/// - `create_token` returns the existing record for a known address
/// - `append_market_snapshot` ignores an exact repeat of the same reading
/// - `create_topic` returns the existing topic for a known normalized name
/// - `add_member_to_topic` returns false when the pair already exists
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn find_token(&self, address: &str) -> StoreResult<Option<TokenRecord>>;

    async fn get_token(&self, id: TokenId) -> StoreResult<Option<TokenRecord>>;

    async fn create_token(&self, token: NewToken) -> StoreResult<TokenRecord>;

    async fn update_token_identity(
        &self,
        id: TokenId,
        update: IdentityUpdate,
    ) -> StoreResult<TokenRecord>;

    /// Append a snapshot; the token must exist
    async fn append_market_snapshot(&self, snapshot: MarketSnapshot) -> StoreResult<MarketSnapshot>;

    async fn latest_snapshot(&self, id: TokenId) -> StoreResult<Option<MarketSnapshot>>;

    async fn snapshot_history(&self, id: TokenId) -> StoreResult<Vec<MarketSnapshot>>;

    /// Tokens with at least one snapshot, paired with their latest one
    async fn tracked_tokens(&self) -> StoreResult<Vec<(TokenRecord, MarketSnapshot)>>;

    async fn find_topic_by_name(&self, name: &str) -> StoreResult<Option<Topic>>;

    async fn create_topic(&self, topic: NewTopic) -> StoreResult<Topic>;

    async fn update_topic(&self, id: TopicId, update: TopicUpdate) -> StoreResult<Topic>;

    async fn add_member_to_topic(&self, topic_id: TopicId, token_id: TokenId) -> StoreResult<bool>;

    /// Members in association order
    async fn topic_members(&self, topic_id: TopicId) -> StoreResult<Vec<TokenRecord>>;

    async fn list_topics(&self) -> StoreResult<Vec<Topic>>;
}
