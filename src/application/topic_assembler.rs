//! Topic Assembler
//!
//! Turns qualifying clusters into persisted topics: picks a name by keyword
//! vote, creates or merges the topic, attaches members, recomputes hotness
//! and publishes the resulting event.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::clustering::Cluster;
use crate::domain::{
    normalize_topic_name, NewTopic, Topic, TopicAggregates, TopicEvent, TopicEventKind, TopicUpdate,
};
use crate::ports::{StoreError, TokenStore, TopicNotifier};

/// Keywords never used as a topic name
pub const TOPIC_STOP_WORDS: &[&str] = &[
    "coin", "token", "the", "of", "sol", "solana", "meme", "official", "new", "fair", "launch",
];

/// Keywords kept in a topic's summary
pub const MAX_TOPIC_KEYWORDS: usize = 10;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cluster has no usable name")]
    Unnamed,
}

fn is_stop_word(keyword: &str) -> bool {
    TOPIC_STOP_WORDS.contains(&keyword)
}

/// Most frequent non-stop-word keyword, else the first member's symbol
pub fn representative_name(cluster: &Cluster) -> Option<String> {
    cluster
        .keywords
        .iter()
        .find(|k| !is_stop_word(k))
        .cloned()
        .or_else(|| {
            cluster
                .seed()
                .map(|seed| normalize_topic_name(&seed.symbol))
                .filter(|symbol| !symbol.is_empty())
        })
}

/// New keywords first, then previous ones, stop words dropped
fn merge_keywords(fresh: &[String], previous: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for keyword in fresh.iter().chain(previous) {
        if !is_stop_word(keyword) && !merged.contains(keyword) {
            merged.push(keyword.clone());
        }
        if merged.len() == MAX_TOPIC_KEYWORDS {
            break;
        }
    }
    merged
}

pub struct TopicAssembler {
    store: Arc<dyn TokenStore>,
    notifier: Arc<dyn TopicNotifier>,
}

impl TopicAssembler {
    pub fn new(store: Arc<dyn TokenStore>, notifier: Arc<dyn TopicNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Create or merge the topic for one cluster and publish the event
    pub async fn assemble(&self, cluster: &Cluster) -> Result<TopicEvent, AssemblyError> {
        let name = representative_name(cluster).ok_or(AssemblyError::Unnamed)?;

        // nothing is written for a cluster with an unknown member
        for member in &cluster.members {
            if self.store.get_token(member.id).await?.is_none() {
                return Err(StoreError::TokenNotFound(member.id).into());
            }
        }

        let (topic, kind) = match self.store.find_topic_by_name(&name).await? {
            Some(existing) => (existing, TopicEventKind::Updated),
            None => {
                let keywords = merge_keywords(&cluster.keywords, &[]);
                let created = self.store.create_topic(NewTopic::new(&name, keywords, 0.0)).await?;
                tracing::info!("New topic '{}' from {} tokens", created.name, cluster.len());
                (created, TopicEventKind::Created)
            }
        };

        let mut added = 0;
        for member in &cluster.members {
            if self.store.add_member_to_topic(topic.id, member.id).await? {
                added += 1;
            }
        }

        let members = self.store.topic_members(topic.id).await?;
        let mut with_snapshots = Vec::with_capacity(members.len());
        for member in &members {
            let latest = self.store.latest_snapshot(member.id).await?;
            with_snapshots.push((member.clone(), latest));
        }
        let aggregates = TopicAggregates::collect(&with_snapshots, Utc::now());

        let topic: Topic = self
            .store
            .update_topic(
                topic.id,
                TopicUpdate {
                    keywords: merge_keywords(&cluster.keywords, &topic.keywords),
                    hotness: aggregates.hotness(),
                },
            )
            .await?;

        tracing::debug!(
            topic = %topic.name,
            "{} new members, {} total, hotness {:.1}",
            added,
            members.len(),
            topic.hotness
        );

        let event = TopicEvent {
            kind,
            topic,
            members,
            aggregates,
        };
        if let Err(e) = self.notifier.publish(&event).await {
            tracing::warn!(topic = %event.topic.name, "Failed to publish topic event: {}", e);
        }
        Ok(event)
    }

    /// Assemble every cluster; one failing cluster does not stop the rest
    pub async fn assemble_all(&self, clusters: &[Cluster]) -> Vec<TopicEvent> {
        let mut events = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            match self.assemble(cluster).await {
                Ok(event) => events.push(event),
                Err(e) => tracing::error!(
                    "Topic assembly failed for cluster of {} tokens: {}",
                    cluster.len(),
                    e
                ),
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::InMemoryStore;
    use crate::clustering::rank_keywords;
    use crate::domain::{NewToken, TokenId, TokenRecord};
    use crate::ports::notifier::MockTopicNotifier;
    use crate::ports::NotifyError;
    use approx::assert_relative_eq;

    async fn stored(store: &InMemoryStore, seed: u8, name: &str, symbol: &str) -> TokenRecord {
        store
            .create_token(NewToken {
                address: bs58::encode([seed; 32]).into_string(),
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals: 9,
                icon: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    fn cluster(members: Vec<TokenRecord>) -> Cluster {
        Cluster {
            keywords: rank_keywords(&members),
            members,
            confidence: 0.8,
        }
    }

    fn accepting_notifier(times: usize) -> MockTopicNotifier {
        let mut notifier = MockTopicNotifier::new();
        notifier.expect_publish().times(times).returning(|_| Ok(()));
        notifier
    }

    async fn cat_cluster(store: &InMemoryStore) -> Cluster {
        cluster(vec![
            stored(store, 1, "Cat Coin", "CATC").await,
            stored(store, 2, "Cat Token", "CATT").await,
            stored(store, 3, "Space Cat", "SCAT").await,
        ])
    }

    #[tokio::test]
    async fn test_representative_name_by_vote() {
        let store = InMemoryStore::new();
        assert_eq!(representative_name(&cat_cluster(&store).await), Some("cat".to_string()));
    }

    #[tokio::test]
    async fn test_representative_name_falls_back_to_symbol() {
        let store = InMemoryStore::new();
        let members = vec![
            stored(&store, 1, "Sol Coin", "SOL").await,
            stored(&store, 2, "Coin Token", "COIN").await,
            stored(&store, 3, "The Token", "TOKEN").await,
        ];
        assert_eq!(representative_name(&cluster(members)), Some("sol".to_string()));
    }

    #[tokio::test]
    async fn test_assemble_creates_topic_and_publishes() {
        let store = Arc::new(InMemoryStore::new());
        let cats = cat_cluster(&store).await;

        let mut notifier = MockTopicNotifier::new();
        notifier
            .expect_publish()
            .withf(|event: &TopicEvent| {
                event.kind == TopicEventKind::Created && event.members.len() == 3
            })
            .times(1)
            .returning(|_| Ok(()));
        let assembler = TopicAssembler::new(store.clone(), Arc::new(notifier));

        let event = assembler.assemble(&cats).await.unwrap();

        assert_eq!(event.topic.name, "cat");
        assert_eq!(event.aggregates.member_count, 3);
        assert!(!event.topic.keywords.contains(&"coin".to_string()));
        // 15*3 + recency 50, no market data yet
        assert_relative_eq!(event.topic.hotness, 95.0, epsilon = 0.1);
        assert!(event.topic.description.starts_with("Auto-generated topic."));
    }

    #[tokio::test]
    async fn test_assembling_twice_merges() {
        let store = Arc::new(InMemoryStore::new());
        let cats = cat_cluster(&store).await;
        let assembler = TopicAssembler::new(store.clone(), Arc::new(accepting_notifier(2)));

        let first = assembler.assemble(&cats).await.unwrap();
        let second = assembler.assemble(&cats).await.unwrap();

        assert_eq!(first.topic.id, second.topic.id);
        assert_eq!(second.kind, TopicEventKind::Updated);
        assert_eq!(store.list_topics().await.unwrap().len(), 1);
        assert_eq!(store.topic_members(first.topic.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_merge_adds_new_members() {
        let store = Arc::new(InMemoryStore::new());
        let cats = cat_cluster(&store).await;
        let assembler = TopicAssembler::new(store.clone(), Arc::new(accepting_notifier(2)));
        assembler.assemble(&cats).await.unwrap();

        let mut more = cats.members.clone();
        more.push(stored(&store, 4, "Cat Moon", "CATM").await);
        let event = assembler.assemble(&cluster(more)).await.unwrap();

        assert_eq!(event.members.len(), 4);
        assert_relative_eq!(event.topic.hotness, 110.0, epsilon = 0.1);
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_assembly() {
        let store = Arc::new(InMemoryStore::new());
        let cats = cat_cluster(&store).await;

        let mut notifier = MockTopicNotifier::new();
        notifier
            .expect_publish()
            .returning(|_| Err(NotifyError::Delivery("socket closed".into())));
        let assembler = TopicAssembler::new(store.clone(), Arc::new(notifier));

        assert!(assembler.assemble(&cats).await.is_ok());
        assert!(store.find_topic_by_name("cat").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_assemble_all_isolates_failures() {
        let store = Arc::new(InMemoryStore::new());
        let cats = cat_cluster(&store).await;

        let mut ghost = stored(&store, 9, "Frog Coin", "FROG").await;
        ghost.id = TokenId(999);
        let frogs = cluster(vec![ghost.clone(), ghost.clone(), ghost]);

        let assembler = TopicAssembler::new(store.clone(), Arc::new(accepting_notifier(1)));
        let events = assembler.assemble_all(&[frogs, cats]).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic.name, "cat");
        assert!(store.find_topic_by_name("frog").await.unwrap().is_none());
    }
}
