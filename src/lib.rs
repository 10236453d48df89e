//! Trend Hunter - token ingestion, name clustering and adaptive refresh
//!
//! Discovers newly listed Solana tokens across several market-data
//! providers, groups look-alike names (including romanized CJK names) into
//! persistent topics, and re-fetches market figures at a cadence matched
//! to each token's importance.
//!
//! # Modules
//!
//! - `domain`: Core data model (TokenRecord, MarketSnapshot, Topic, RefreshPriority)
//! - `ports`: Trait abstractions (ProviderClient, TokenStore, TopicNotifier)
//! - `clustering`: Similarity scoring, keyword extraction and greedy clustering
//! - `adapters`: External implementations (providers, JSON store, notifiers, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Aggregator, ingestion, topic assembly, refresh and scheduling

pub mod domain;
pub mod ports;
pub mod clustering;
pub mod adapters;
pub mod config;
pub mod application;
