//! Auction lifecycle events.

use chrono::{DateTime, Duration, Utc};
use common::AuctionId;
use serde::{Deserialize, Serialize};

use crate::event::{IntegrationEvent, Repairable};

/// Published by the auction service when a new auction is listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionCreated {
    pub id: AuctionId,
    pub reserve_price: i64,
    pub seller: String,
    pub winner: Option<String>,
    pub sold_amount: i64,
    pub current_high_bid: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub auction_end: DateTime<Utc>,
    pub status: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub mileage: i64,
    pub image_url: String,
}

impl AuctionCreated {
    /// Creates a live auction for the given vehicle, ending in seven days.
    pub fn new(
        seller: impl Into<String>,
        make: impl Into<String>,
        model: impl Into<String>,
        year: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AuctionId::new(),
            reserve_price: 0,
            seller: seller.into(),
            winner: None,
            sold_amount: 0,
            current_high_bid: 0,
            created_at: now,
            updated_at: now,
            auction_end: now + Duration::days(7),
            status: "Live".to_string(),
            make: make.into(),
            model: model.into(),
            year,
            color: String::new(),
            mileage: 0,
            image_url: String::new(),
        }
    }
}

impl IntegrationEvent for AuctionCreated {
    const EVENT_TYPE: &'static str = "AuctionCreated";

    fn event_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}

impl Repairable for AuctionCreated {
    fn text_field_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "seller" => Some(&mut self.seller),
            "status" => Some(&mut self.status),
            "make" => Some(&mut self.make),
            "model" => Some(&mut self.model),
            "color" => Some(&mut self.color),
            "image_url" => Some(&mut self.image_url),
            _ => None,
        }
    }

    fn text_field(&self, field: &str) -> Option<&str> {
        match field {
            "seller" => Some(&self.seller),
            "status" => Some(&self.status),
            "make" => Some(&self.make),
            "model" => Some(&self.model),
            "color" => Some(&self.color),
            "image_url" => Some(&self.image_url),
            _ => None,
        }
    }
}
