//! Search-side consumer that indexes created auctions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bus::{AsFault, Consumer, ExceptionKind};
use common::AuctionId;
use contracts::AuctionCreated;
use thiserror::Error;
use tokio::sync::RwLock;

/// Model name the search side refuses to index.
pub const REJECTED_MODEL: &str = "Foo";

/// Errors raised while indexing an auction.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The auction's model name is not accepted.
    #[error("Cannot sell cars with name of {0}")]
    RejectedModel(String),
}

impl AsFault for SearchError {
    fn exception_kind(&self) -> ExceptionKind {
        match self {
            SearchError::RejectedModel(_) => ExceptionKind::Argument,
        }
    }
}

/// In-memory search index keyed by auction ID.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    items: Arc<RwLock<HashMap<AuctionId, AuctionCreated>>>,
}

impl SearchIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an auction.
    pub async fn upsert(&self, auction: AuctionCreated) {
        self.items.write().await.insert(auction.id, auction);
    }

    /// Returns the indexed auction, if any.
    pub async fn get(&self, id: AuctionId) -> Option<AuctionCreated> {
        self.items.read().await.get(&id).cloned()
    }

    /// Returns the number of indexed auctions.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Returns true if nothing has been indexed.
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

/// Indexes every `AuctionCreated` it receives.
#[derive(Debug, Clone)]
pub struct SearchIndexConsumer {
    index: SearchIndex,
}

impl SearchIndexConsumer {
    pub fn new(index: SearchIndex) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Consumer<AuctionCreated> for SearchIndexConsumer {
    type Error = SearchError;

    #[tracing::instrument(skip(self, auction), fields(auction_id = %auction.id))]
    async fn consume(&self, auction: AuctionCreated) -> Result<(), SearchError> {
        if auction.model == REJECTED_MODEL {
            return Err(SearchError::RejectedModel(auction.model));
        }

        tracing::info!(model = %auction.model, "indexing auction");
        self.index.upsert(auction).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepted_auctions_are_indexed() {
        let index = SearchIndex::new();
        let consumer = SearchIndexConsumer::new(index.clone());
        let auction = AuctionCreated::new("tom", "Ford", "Mustang", 2023);

        consumer.consume(auction.clone()).await.unwrap();

        assert_eq!(index.get(auction.id).await, Some(auction));
    }

    #[tokio::test]
    async fn rejected_model_is_an_argument_fault() {
        let index = SearchIndex::new();
        let consumer = SearchIndexConsumer::new(index.clone());

        let err = consumer
            .consume(AuctionCreated::new("tom", "Ford", "Foo", 2023))
            .await
            .unwrap_err();

        assert_eq!(err.exception_kind(), ExceptionKind::Argument);
        assert_eq!(err.to_string(), "Cannot sell cars with name of Foo");
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn redelivery_replaces_the_entry() {
        let index = SearchIndex::new();
        let consumer = SearchIndexConsumer::new(index.clone());
        let auction = AuctionCreated::new("tom", "Ford", "GT", 2023);

        consumer.consume(auction.clone()).await.unwrap();
        consumer.consume(auction).await.unwrap();

        assert_eq!(index.len().await, 1);
    }
}
