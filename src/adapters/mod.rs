//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Providers: Birdeye, DexScreener, Solscan and Helius HTTP clients
//! - Store: in-memory token store with JSON persistence
//! - Notifier: broadcast, log and fan-out topic notifiers
//! - CLI: Command-line interface handlers

pub mod providers;
pub mod store;
pub mod notifier;
pub mod cli;

pub use cli::CliApp;
pub use notifier::{BroadcastNotifier, FanoutNotifier, LogNotifier};
pub use providers::build_providers;
pub use store::InMemoryStore;
