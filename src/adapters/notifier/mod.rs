//! Topic event delivery
//!
//! - `BroadcastNotifier`: in-process fan-out over a tokio broadcast channel
//! - `LogNotifier`: one log line per event

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{TopicEvent, TopicEventKind};
use crate::ports::{NotifyError, TopicNotifier};

/// Default broadcast buffer; slow subscribers past this lag and skip
pub const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<TopicEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TopicEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

#[async_trait]
impl TopicNotifier for BroadcastNotifier {
    async fn publish(&self, event: &TopicEvent) -> Result<(), NotifyError> {
        // no subscribers is not a failure
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(topic = %event.topic.name, "no subscribers for topic event");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl TopicNotifier for LogNotifier {
    async fn publish(&self, event: &TopicEvent) -> Result<(), NotifyError> {
        let kind = match event.kind {
            TopicEventKind::Created => "created",
            TopicEventKind::Updated => "updated",
        };
        tracing::info!(
            "Topic {} '{}': {} members, hotness {:.1}, mc ${:.0}, liq ${:.0}",
            kind,
            event.topic.name,
            event.aggregates.member_count,
            event.topic.hotness,
            event.aggregates.total_market_cap,
            event.aggregates.total_liquidity
        );
        Ok(())
    }
}

/// Publishes to several notifiers; the first failure is reported after all ran
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn TopicNotifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn TopicNotifier>>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl TopicNotifier for FanoutNotifier {
    async fn publish(&self, event: &TopicEvent) -> Result<(), NotifyError> {
        let mut first_error = None;
        for target in &self.targets {
            if let Err(e) = target.publish(event).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
