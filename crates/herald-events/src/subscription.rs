//! Subscription handles returned by the bus.

use std::fmt;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::listener::ListenerId;

/// Registry operations a subscription handle needs from its bus.
pub(crate) trait Registration: Send + Sync {
    fn detach(&self, pattern: &str, listener: ListenerId);
    fn is_attached(&self, pattern: &str, listener: ListenerId) -> bool;
}

/// Handle to one registered listener.
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it. The handle only holds a weak
/// reference, so it never keeps a bus alive.
pub struct Subscription {
    pattern: String,
    listener: ListenerId,
    bus: Weak<dyn Registration>,
    released: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(pattern: &str, listener: ListenerId, bus: Weak<dyn Registration>) -> Self {
        Self {
            pattern: pattern.to_string(),
            listener,
            bus,
            released: AtomicBool::new(false),
        }
    }

    /// Remove the listener from the bus. Calling this more than once, or
    /// after the listener was removed some other way, does nothing.
    pub fn unsubscribe(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.detach(&self.pattern, self.listener);
        }
    }

    /// Pattern the listener was registered under.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Identity of the registered listener.
    #[must_use]
    pub const fn listener_id(&self) -> ListenerId {
        self.listener
    }

    /// Whether the listener is still registered on a live bus.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.released.load(Ordering::Acquire)
            && self
                .bus
                .upgrade()
                .is_some_and(|bus| bus.is_attached(&self.pattern, self.listener))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pattern", &self.pattern)
            .field("listener", &self.listener)
            .field("released", &self.released.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeBus {
        detached: Mutex<Vec<(String, ListenerId)>>,
        attached: AtomicBool,
    }

    impl Registration for FakeBus {
        fn detach(&self, pattern: &str, listener: ListenerId) {
            if let Ok(mut detached) = self.detached.lock() {
                detached.push((pattern.to_string(), listener));
            }
            self.attached.store(false, Ordering::SeqCst);
        }

        fn is_attached(&self, _: &str, _: ListenerId) -> bool {
            self.attached.load(Ordering::SeqCst)
        }
    }

    fn listener_id() -> ListenerId {
        crate::listener::Listener::<()>::sync(|_| Ok(())).id()
    }

    #[test]
    fn unsubscribe_detaches_once() {
        let bus = Arc::new(FakeBus::default());
        bus.attached.store(true, Ordering::SeqCst);
        let weak: Weak<FakeBus> = Arc::downgrade(&bus);
        let id = listener_id();
        let subscription = Subscription::new("a.*", id, weak);

        assert!(subscription.is_active());
        assert_eq!(subscription.pattern(), "a.*");
        assert_eq!(subscription.listener_id(), id);

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());
        let detached = bus.detached.lock().map(|d| d.len()).unwrap_or_default();
        assert_eq!(detached, 1);
    }

    #[test]
    fn dead_bus_is_inactive_and_safe() {
        let bus = Arc::new(FakeBus::default());
        let weak: Weak<FakeBus> = Arc::downgrade(&bus);
        let subscription = Subscription::new("a", listener_id(), weak);
        drop(bus);
        assert!(!subscription.is_active());
        subscription.unsubscribe();
    }
}
