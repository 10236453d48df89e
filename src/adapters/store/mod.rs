//! Persistence adapters

pub mod memory;

pub use memory::{InMemoryStore, PersistedState, DEFAULT_STORE_FILE};
