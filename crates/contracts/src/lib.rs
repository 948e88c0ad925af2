//! Message contracts exchanged over the event bus.
//!
//! - [`IntegrationEvent`] ties a payload type to the event type key it is
//!   published under.
//! - [`Repairable`] exposes an event's named text fields to repair transforms.
//! - [`AuctionCreated`] is the domain event whose faults are compensated.

pub mod auction;
pub mod event;

pub use auction::AuctionCreated;
pub use event::{IntegrationEvent, Repairable};
