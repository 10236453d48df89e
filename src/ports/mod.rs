//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Market-data providers (metadata, prices, listings, holders)
//! - Persistence of tokens, snapshots and topics
//! - Delivery of topic events

pub mod provider;
pub mod store;
pub mod notifier;
pub mod mocks;

// Re-export main traits and types
pub use provider::{ProviderClient, ProviderError, ProviderResult};
pub use store::{StoreError, StoreResult, TokenStore};
pub use notifier::{NotifyError, TopicNotifier};
