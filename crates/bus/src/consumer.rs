//! Message consumer trait.

use async_trait::async_trait;

use crate::fault::AsFault;

/// Handles messages delivered by a [`ReceiveEndpoint`](crate::ReceiveEndpoint).
///
/// A failed consume is retried by the endpoint's policy, so consumers must
/// tolerate seeing the same message more than once. Errors are reported in
/// fault records, hence the [`AsFault`] bound.
#[async_trait]
pub trait Consumer<M>: Send + Sync
where
    M: Send + 'static,
{
    type Error: AsFault + Send + Sync + 'static;

    /// Consumes one message.
    async fn consume(&self, message: M) -> Result<(), Self::Error>;
}
