//! Topics
//!
//! A topic is a persisted trend: a normalized name, a keyword summary and a
//! set of member tokens.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::{MarketSnapshot, TokenId, TokenRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicId(pub u64);

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Lowercase, trim and collapse inner whitespace.
///
/// Two topics whose names normalize equally are the same topic.
pub fn normalize_topic_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    /// Normalized name, unique across topics
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub hotness: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTopic {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub hotness: f64,
}

impl NewTopic {
    pub fn new(name: &str, keywords: Vec<String>, hotness: f64) -> Self {
        let description = format!("Auto-generated topic. Keywords: {}", keywords.join(", "));
        Self {
            name: normalize_topic_name(name),
            description,
            keywords,
            hotness,
        }
    }
}

/// Keyword and hotness refresh applied on merge
#[derive(Debug, Clone, PartialEq)]
pub struct TopicUpdate {
    pub keywords: Vec<String>,
    pub hotness: f64,
}

/// Association row between a topic and a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMember {
    pub topic_id: TopicId,
    pub token_id: TokenId,
    pub added_at: DateTime<Utc>,
}

/// Totals over a topic's members
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicAggregates {
    pub member_count: usize,
    pub total_market_cap: f64,
    pub total_liquidity: f64,
    pub total_volume_24h: f64,
    pub avg_age_hours: f64,
}

impl TopicAggregates {
    /// Sum member figures; members without a snapshot contribute zero
    pub fn collect(members: &[(TokenRecord, Option<MarketSnapshot>)], now: DateTime<Utc>) -> Self {
        if members.is_empty() {
            return Self::default();
        }

        let mut aggregates = Self {
            member_count: members.len(),
            ..Default::default()
        };
        let mut total_age = 0.0;

        for (token, snapshot) in members {
            if let Some(snapshot) = snapshot {
                aggregates.total_market_cap += snapshot.figures.market_cap;
                aggregates.total_liquidity += snapshot.figures.liquidity;
                aggregates.total_volume_24h += snapshot.figures.volume_24h;
            }
            total_age += token.age_hours(now);
        }

        aggregates.avg_age_hours = total_age / members.len() as f64;
        aggregates
    }

    /// `15n + 8·log10(mc) + 5·log10(liq) + max(0, 50 − 2·age)`, floored at zero
    pub fn hotness(&self) -> f64 {
        let size = 15.0 * self.member_count as f64;
        let market_cap = 8.0 * self.total_market_cap.max(1.0).log10();
        let liquidity = 5.0 * self.total_liquidity.max(1.0).log10();
        let recency = (50.0 - 2.0 * self.avg_age_hours).max(0.0);
        (size + market_cap + liquidity + recency).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicEventKind {
    #[serde(rename = "topic.created")]
    Created,
    #[serde(rename = "topic.updated")]
    Updated,
}

/// Payload published after a topic is created or merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicEvent {
    pub kind: TopicEventKind,
    pub topic: Topic,
    pub members: Vec<TokenRecord>,
    pub aggregates: TopicAggregates,
}
