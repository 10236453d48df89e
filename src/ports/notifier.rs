use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TopicEvent;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("Failed to deliver topic event: {0}")]
    Delivery(String),
}

/// Outbound topic.created / topic.updated events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TopicNotifier: Send + Sync {
    async fn publish(&self, event: &TopicEvent) -> Result<(), NotifyError>;
}
