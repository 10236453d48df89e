use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BasicInfo, ListedToken, ProviderKind, TokenInfo};

/// Provider error type
///
/// "Nothing known about this address" is `Ok(None)`, not an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited (429)")]
    RateLimited,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl ProviderError {
    /// Timeouts and throttling get one bounded retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Timeout | ProviderError::RateLimited)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Uniform contract to one market-data backend
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Name, symbol and icon for an address
    async fn basic_info(&self, address: &str) -> ProviderResult<Option<BasicInfo>>;

    /// Identity plus market figures for an address
    async fn full_info(&self, address: &str) -> ProviderResult<Option<TokenInfo>>;

    /// Tokens listed within the last `window_hours`
    async fn recent_listings(&self, window_hours: u32) -> ProviderResult<Vec<ListedToken>> {
        let _ = window_hours;
        Err(ProviderError::Unsupported(format!("{} has no listings feed", self.kind())))
    }

    async fn holder_count(&self, address: &str) -> ProviderResult<Option<u64>>;

    fn supports_listings(&self) -> bool {
        false
    }
}
