//! Stream adapter over a bus subscription.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::payloads::EventEnvelope;
use crate::subscription::Subscription;

/// Envelopes delivered to a pattern, in dispatch order.
///
/// The stream is backed by an unbounded channel; dropping it unsubscribes.
pub struct EventStream<T> {
    inner: UnboundedReceiverStream<Arc<EventEnvelope<T>>>,
    subscription: Subscription,
}

impl<T> EventStream<T> {
    pub(crate) const fn new(
        inner: UnboundedReceiverStream<Arc<EventEnvelope<T>>>,
        subscription: Subscription,
    ) -> Self {
        Self {
            inner,
            subscription,
        }
    }

    /// Receive the next envelope. Returns `None` once the bus has been
    /// dropped or cleared and every buffered envelope was consumed.
    pub async fn recv(&mut self) -> Option<Arc<EventEnvelope<T>>> {
        self.inner.next().await
    }

    /// Subscription feeding this stream.
    #[must_use]
    pub const fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl<T> Stream for EventStream<T> {
    type Item = Arc<EventEnvelope<T>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
