//! Domain Layer - Core data model for trend hunting
//!
//! Pure types with no I/O. All external interactions happen through the
//! ports layer.
//!
//! - `token`: token identity, market figures and snapshots
//! - `topic`: persisted topics, aggregates and change events
//! - `priority`: refresh tiers derived from the latest snapshot

pub mod token;
pub mod topic;
pub mod priority;

pub use token::{
    is_valid_address, BasicInfo, IdentityUpdate, ListedToken, MarketFigures, MarketSnapshot,
    NewToken, ProviderKind, TokenId, TokenInfo, TokenRecord, ADDRESS_BYTES,
    DEFAULT_DECIMALS,
};
pub use topic::{
    normalize_topic_name, NewTopic, Topic, TopicAggregates, TopicEvent, TopicEventKind, TopicId,
    TopicMember, TopicUpdate,
};
pub use priority::{priority_score, RefreshPriority, TierCadence};
