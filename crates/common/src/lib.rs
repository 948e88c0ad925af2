//! Shared identifier types used across the bus, contracts and compensation crates.

pub mod types;

pub use types::{AuctionId, MessageId};
