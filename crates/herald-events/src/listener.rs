//! Caller-supplied callbacks: listeners, middleware, and filters.
//!
//! # Design
//! - Callbacks are stored behind `Arc` so the bus can clone them out of its
//!   state lock and invoke them without holding it.
//! - Listeners compare by identity (`ListenerId`), never by behaviour.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BoxError;
use crate::payloads::{EventEnvelope, EventMetadata};

/// Boxed future returned by bus callbacks.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Outcome of a single listener invocation.
pub type ListenerResult = Result<(), BoxError>;

/// Outcome of a middleware stage: `Ok(None)` vetoes the emission.
pub type MiddlewareResult<T> = Result<Option<T>, BoxError>;

type ListenerFn<T> = dyn Fn(Arc<EventEnvelope<T>>) -> BoxFuture<ListenerResult> + Send + Sync;
type MiddlewareFn<T> = dyn Fn(T, Arc<str>) -> BoxFuture<MiddlewareResult<T>> + Send + Sync;
type FilterFn<T> = dyn Fn(&T, &EventMetadata) -> bool + Send + Sync;

/// Identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A unit of work invoked with each matching emission.
///
/// Cloning a listener keeps its identity; two independently constructed
/// listeners are never equal, even when built from the same closure.
pub struct Listener<T> {
    id: ListenerId,
    handler: Arc<ListenerFn<T>>,
    once: Option<Arc<AtomicBool>>,
}

impl<T> Listener<T>
where
    T: Send + Sync + 'static,
{
    /// Build a listener from an asynchronous handler.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Arc<EventEnvelope<T>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        Self {
            id: ListenerId::generate(),
            handler: Arc::new(move |event| -> BoxFuture<ListenerResult> {
                Box::pin(handler(event))
            }),
            once: None,
        }
    }

    /// Build a listener from a synchronous handler.
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(&EventEnvelope<T>) -> ListenerResult + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(move |event| {
            let handler = Arc::clone(&handler);
            async move { handler(&event) }
        })
    }
}

impl<T> Listener<T> {
    /// Identity used for removal.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    pub(crate) fn invoke(&self, event: Arc<EventEnvelope<T>>) -> BoxFuture<ListenerResult> {
        (self.handler)(event)
    }

    pub(crate) fn from_parts(id: ListenerId, handler: Arc<ListenerFn<T>>) -> Self {
        Self {
            id,
            handler,
            once: None,
        }
    }

    /// Limit the listener, and every clone of it, to a single claimed
    /// invocation.
    pub(crate) fn single_use(mut self) -> Self {
        self.once = Some(Arc::new(AtomicBool::new(false)));
        self
    }

    /// Reserve the next invocation. Always succeeds for ordinary listeners;
    /// a single-use listener succeeds exactly once across all clones.
    pub(crate) fn claim(&self) -> bool {
        self.once
            .as_ref()
            .is_none_or(|fired| !fired.swap(true, Ordering::AcqRel))
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
            once: self.once.clone(),
        }
    }
}

impl<T> PartialEq for Listener<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Listener<T> {}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}

/// A payload transform applied to every emission, in registration order.
pub struct Middleware<T> {
    handler: Arc<MiddlewareFn<T>>,
}

impl<T> Middleware<T>
where
    T: Send + 'static,
{
    /// Build a middleware from an asynchronous, fallible transform.
    ///
    /// Returning `Ok(None)` vetoes the emission. Returning `Err` fails the
    /// `emit` call.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(T, Arc<str>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MiddlewareResult<T>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |payload, topic| -> BoxFuture<MiddlewareResult<T>> {
                Box::pin(handler(payload, topic))
            }),
        }
    }

    /// Build a middleware from a synchronous transform; `None` vetoes.
    pub fn map<F>(transform: F) -> Self
    where
        F: Fn(T, &str) -> Option<T> + Send + Sync + 'static,
    {
        let transform = Arc::new(transform);
        Self::new(move |payload, topic| {
            let transform = Arc::clone(&transform);
            async move { Ok(transform(payload, &topic)) }
        })
    }
}

impl<T> Middleware<T> {
    pub(crate) fn apply(&self, payload: T, topic: Arc<str>) -> BoxFuture<MiddlewareResult<T>> {
        (self.handler)(payload, topic)
    }
}

impl<T> Clone for Middleware<T> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T> fmt::Debug for Middleware<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

/// A per-topic predicate; every filter on a topic must pass for delivery.
pub struct Filter<T> {
    predicate: Arc<FilterFn<T>>,
}

impl<T> Filter<T> {
    /// Build a filter from a predicate over the payload and its metadata.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T, &EventMetadata) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the predicate.
    #[must_use]
    pub fn allows(&self, payload: &T, metadata: &EventMetadata) -> bool {
        (self.predicate)(payload, metadata)
    }
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io;

    fn envelope(payload: i64) -> Arc<EventEnvelope<i64>> {
        Arc::new(EventEnvelope {
            metadata: EventMetadata {
                id: 1,
                timestamp: Utc::now(),
                topic: "n".to_string(),
                source: None,
            },
            payload,
        })
    }

    #[test]
    fn listener_identity_survives_clone() {
        let first = Listener::<i64>::sync(|_| Ok(()));
        let second = Listener::<i64>::sync(|_| Ok(()));
        assert_eq!(first, first.clone());
        assert_ne!(first, second);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn single_use_listener_is_claimed_once_across_clones() {
        let plain = Listener::<i64>::sync(|_| Ok(()));
        assert!(plain.claim());
        assert!(plain.claim());

        let once = Listener::<i64>::sync(|_| Ok(())).single_use();
        let twin = once.clone();
        assert!(twin.claim());
        assert!(!once.claim());
        assert!(!twin.claim());
    }

    #[tokio::test]
    async fn sync_listener_reports_errors() {
        let listener = Listener::<i64>::sync(|event| {
            if event.payload < 0 {
                Err(io::Error::other("negative").into())
            } else {
                Ok(())
            }
        });
        assert!(listener.invoke(envelope(1)).await.is_ok());
        assert!(listener.invoke(envelope(-1)).await.is_err());
    }

    #[tokio::test]
    async fn map_middleware_transforms_and_vetoes() {
        let double = Middleware::<i64>::map(|value, _| Some(value * 2));
        let veto = Middleware::<i64>::map(|_, topic| (topic != "blocked").then_some(0));
        let doubled = double.apply(5, Arc::from("t")).await.ok().flatten();
        assert_eq!(doubled, Some(10));
        let vetoed = veto.apply(5, Arc::from("blocked")).await.ok().flatten();
        assert_eq!(vetoed, None);
    }

    #[test]
    fn filter_sees_payload_and_metadata() {
        let filter = Filter::<i64>::new(|value, metadata| *value > 5 && metadata.topic == "n");
        let event = envelope(10);
        assert!(filter.allows(&event.payload, &event.metadata));
        assert!(!filter.allows(&3, &event.metadata));
    }
}
