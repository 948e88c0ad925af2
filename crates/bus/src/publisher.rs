//! Outbound publish port.

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::MessageId;
use contracts::IntegrationEvent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::fault::{FaultEnvelope, fault_event_type};

/// Anything a receive endpoint can decode and deliver.
///
/// Every [`IntegrationEvent`] is a payload under its own key, and so is the
/// fault envelope of one, under `Fault<EventType>`.
pub trait BusPayload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The routing key this payload travels under.
    fn event_type() -> Cow<'static, str>;

    /// Business identity used in diagnostics.
    fn event_id(&self) -> Option<String>;
}

impl<E: IntegrationEvent> BusPayload for E {
    fn event_type() -> Cow<'static, str> {
        Cow::Borrowed(E::EVENT_TYPE)
    }

    fn event_id(&self) -> Option<String> {
        IntegrationEvent::event_id(self)
    }
}

impl<E: IntegrationEvent> BusPayload for FaultEnvelope<E> {
    fn event_type() -> Cow<'static, str> {
        Cow::Owned(fault_event_type(E::EVENT_TYPE))
    }

    fn event_id(&self) -> Option<String> {
        IntegrationEvent::event_id(self.message())
    }
}

/// A message as it travels over the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    /// ID assigned when the message was published.
    pub message_id: MessageId,

    /// The routing key (e.g. "AuctionCreated", "Fault<AuctionCreated>").
    pub event_type: String,

    /// The message body as JSON.
    pub payload: serde_json::Value,

    /// When the message was published.
    pub published_at: DateTime<Utc>,
}

impl BusMessage {
    /// Creates a message with a fresh ID.
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            message_id: MessageId::new(),
            event_type: event_type.into(),
            payload,
            published_at: Utc::now(),
        }
    }

    /// Decodes the payload into a typed message.
    pub fn decode<M: DeserializeOwned>(&self) -> Result<M> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Publishes messages onto the bus.
///
/// Implementations must be safe to share across concurrent consumers.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes `payload` under `event_type`.
    ///
    /// Fails with `BusError::PublishFailed` when the broker is unreachable;
    /// callers propagate that failure so the delivery is retried.
    async fn publish(&self, event_type: &str, payload: serde_json::Value) -> Result<MessageId>;
}

/// Typed publishing helpers for every [`EventPublisher`].
#[async_trait]
pub trait EventPublisherExt: EventPublisher {
    /// Publishes an integration event under its own event type key.
    async fn publish_event<E: IntegrationEvent>(&self, event: &E) -> Result<MessageId> {
        let payload = serde_json::to_value(event)?;
        self.publish(E::EVENT_TYPE, payload).await
    }

    /// Publishes a fault envelope under `Fault<EventType>`.
    async fn publish_fault<M: BusPayload>(&self, fault: &FaultEnvelope<M>) -> Result<MessageId> {
        let payload = serde_json::to_value(fault)?;
        self.publish(&fault_event_type(&M::event_type()), payload)
            .await
    }
}

impl<T: EventPublisher + ?Sized> EventPublisherExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultRecord;
    use contracts::AuctionCreated;

    #[test]
    fn fault_envelopes_route_under_the_wrapped_key() {
        assert_eq!(
            <AuctionCreated as BusPayload>::event_type(),
            "AuctionCreated"
        );
        assert_eq!(
            <FaultEnvelope<AuctionCreated> as BusPayload>::event_type(),
            "Fault<AuctionCreated>"
        );
    }

    #[test]
    fn fault_envelopes_report_the_wrapped_event_id() {
        let auction = AuctionCreated::new("tom", "Ford", "GT", 2020);
        let envelope =
            FaultEnvelope::new(auction.clone(), vec![FaultRecord::new("X", "y")]).unwrap();

        assert_eq!(
            BusPayload::event_id(&envelope),
            Some(auction.id.to_string())
        );
    }

    #[test]
    fn decode_reports_malformed_payloads() {
        let message = BusMessage::new("AuctionCreated", serde_json::json!({"model": 42}));
        assert!(message.decode::<AuctionCreated>().is_err());
    }
}
