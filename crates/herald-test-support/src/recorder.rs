//! Recording and misbehaving listeners.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use herald_events::{BoxError, EventEnvelope, Listener};

/// Collects every payload delivered to its listeners.
#[derive(Debug)]
pub struct Recorder<T> {
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            seen: Arc::clone(&self.seen),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> Recorder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A new listener that appends each payload to this recorder. Every call
    /// returns a listener with a fresh identity.
    #[must_use]
    pub fn listener(&self) -> Listener<T> {
        let seen = Arc::clone(&self.seen);
        Listener::sync(move |event: &EventEnvelope<T>| {
            seen.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.payload.clone());
            Ok(())
        })
    }

    /// Payloads received so far, in arrival order.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of payloads received.
    #[must_use]
    pub fn count(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A listener that always returns an error carrying `message`.
#[must_use]
pub fn failing_listener<T>(message: &'static str) -> Listener<T>
where
    T: Send + Sync + 'static,
{
    Listener::sync(move |_: &EventEnvelope<T>| -> Result<(), BoxError> {
        Err(Box::new(io::Error::other(message)))
    })
}

/// A listener that panics with `message`.
#[must_use]
pub fn panicking_listener<T>(message: &'static str) -> Listener<T>
where
    T: Send + Sync + 'static,
{
    Listener::sync(move |_: &EventEnvelope<T>| -> Result<(), BoxError> { panic!("{message}") })
}

/// A listener that sleeps for `delay` before succeeding.
#[must_use]
pub fn slow_listener<T>(delay: Duration) -> Listener<T>
where
    T: Send + Sync + 'static,
{
    Listener::new(move |_: Arc<EventEnvelope<T>>| async move {
        tokio::time::sleep(delay).await;
        Ok::<(), BoxError>(())
    })
}
