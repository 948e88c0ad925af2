use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::MessageId;
use tokio::sync::{RwLock, mpsc};

use crate::publisher::{BusMessage, EventPublisher};
use crate::{BusError, Result};

#[derive(Default)]
struct InMemoryBusState {
    /// `None` unless the bus was built with [`InMemoryBus::recording`].
    published: Option<Vec<BusMessage>>,
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<BusMessage>>>,
    failures_remaining: u32,
}

/// In-process bus for tests and single-node runs.
///
/// Fans every published message out to the subscribers of its event type
/// key. Publishes can be made to fail on demand to simulate a broker outage.
///
/// A bus from [`InMemoryBus::new`] retains nothing once a message has been
/// handed to its subscribers. Use [`InMemoryBus::recording`] to also keep a
/// log of every publish for inspection.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    state: Arc<RwLock<InMemoryBusState>>,
}

impl InMemoryBus {
    /// Creates a bus that only fans out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus that also records every successful publish.
    pub fn recording() -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryBusState {
                published: Some(Vec::new()),
                ..InMemoryBusState::default()
            })),
        }
    }

    /// Subscribes to messages published under `event_type`.
    pub async fn subscribe(&self, event_type: &str) -> mpsc::UnboundedReceiver<BusMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .write()
            .await
            .subscribers
            .entry(event_type.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Makes the next `count` publishes fail with `BusError::PublishFailed`.
    pub async fn fail_next_publishes(&self, count: u32) {
        self.state.write().await.failures_remaining = count;
    }

    /// Returns every recorded message, oldest first.
    ///
    /// Always empty unless the bus was built with [`InMemoryBus::recording`].
    pub async fn published(&self) -> Vec<BusMessage> {
        self.state.read().await.published.clone().unwrap_or_default()
    }

    /// Returns the recorded messages published under `event_type`.
    pub async fn published_of_type(&self, event_type: &str) -> Vec<BusMessage> {
        self.state
            .read()
            .await
            .published
            .iter()
            .flatten()
            .filter(|m| m.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Returns the number of recorded publishes.
    pub async fn publish_count(&self) -> usize {
        self.state.read().await.published.as_ref().map_or(0, Vec::len)
    }
}

#[async_trait]
impl EventPublisher for InMemoryBus {
    async fn publish(&self, event_type: &str, payload: serde_json::Value) -> Result<MessageId> {
        let mut state = self.state.write().await;

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(BusError::PublishFailed("broker unreachable".to_string()));
        }

        let message = BusMessage::new(event_type, payload);
        let message_id = message.message_id;

        if let Some(subscribers) = state.subscribers.get_mut(event_type) {
            subscribers.retain(|tx| tx.send(message.clone()).is_ok());
        }
        if let Some(published) = state.published.as_mut() {
            published.push(message);
        }

        metrics::counter!("bus_messages_published_total").increment(1);
        tracing::debug!(%message_id, event_type, "message published");

        Ok(message_id)
    }
}
