//! Traits shared by every message published on the bus.

use serde::{Serialize, de::DeserializeOwned};

/// A message that travels over the bus.
///
/// Integration events are facts announced to other services. The event
/// type key is the routing identity used by publishers and subscriptions.
pub trait IntegrationEvent: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The key this event is published and subscribed under.
    const EVENT_TYPE: &'static str;

    /// Returns the business identity of the event, if it carries one.
    ///
    /// Used only for diagnostics.
    fn event_id(&self) -> Option<String> {
        None
    }
}

/// An event whose named text fields may be rewritten in place.
///
/// Field names are the snake_case names of the Rust fields.
pub trait Repairable {
    /// Returns a mutable handle to the named text field, or `None` if the
    /// event has no such field.
    fn text_field_mut(&mut self, field: &str) -> Option<&mut String>;

    /// Returns the current value of the named text field.
    fn text_field(&self, field: &str) -> Option<&str>;
}
