use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an auction.
///
/// Serialized as a bare UUID string, the form other services key auctions by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuctionId(Uuid);

impl AuctionId {
    /// Creates a new random auction ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuctionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned by the bus to every published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auction_ids_are_unique() {
        assert_ne!(AuctionId::new(), AuctionId::new());
    }

    #[test]
    fn auction_id_serializes_as_its_display_form() {
        let id = AuctionId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));

        let back: AuctionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn message_id_display_is_a_uuid() {
        let id = MessageId::new();
        assert!(Uuid::parse_str(&id.to_string()).is_ok());
    }
}
