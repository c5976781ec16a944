//! The event bus composition root.
//!
//! # Design
//! - One `Mutex<BusState>` guards the registry, filters, history, and stats.
//!   Bookkeeping for an emission happens in a single critical section and no
//!   caller code (middleware, filters, listeners, loggers) runs under it.
//! - Middleware is bus-global and append-only; `clear` never touches it.
//! - Emission and replay are delegated to the `OperationExecutor`, which
//!   times, logs, and counts them.
//! - Listener failures are recovered here and never surface from `emit`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use herald_config::BusConfig;
use herald_telemetry::{Metrics, OperationExecutor};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::dispatch::{self, ListenerFailure};
use crate::error::{BoxError, EventBusError, EventBusResult};
use crate::filters::{self, FilterEngine};
use crate::history::HistoryStore;
use crate::listener::{BoxFuture, Filter, Listener, ListenerId, ListenerResult, Middleware};
use crate::logging::{BusLogger, GuardedLogger, TracingLogger};
use crate::middleware::{self, MiddlewarePipeline, PipelineOutcome};
use crate::payloads::{
    DispatchReport, EmitOutcome, EventEnvelope, EventId, EventMetadata, ReplayOutcome, TopicStats,
};
use crate::registry::Registry;
use crate::stats::StatsTracker;
use crate::stream::EventStream;
use crate::subscription::{Registration, Subscription};

const OP_EMIT: &str = "event_bus.emit";
const OP_REPLAY: &str = "event_bus.replay";

/// Bus carrying arbitrary JSON payloads.
pub type DynamicEventBus = EventBus<serde_json::Value>;

struct BusState<T> {
    registry: Registry<T>,
    filters: FilterEngine<T>,
    history: HistoryStore<T>,
    stats: StatsTracker,
}

impl<T> BusState<T> {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
            filters: FilterEngine::new(),
            history: HistoryStore::new(),
            stats: StatsTracker::new(),
        }
    }
}

struct BusInner<T> {
    config: BusConfig,
    state: Mutex<BusState<T>>,
    middleware: MiddlewarePipeline<T>,
    logger: GuardedLogger,
    executor: OperationExecutor,
    next_id: AtomicU64,
}

impl<T> BusInner<T> {
    fn lock_state(&self) -> MutexGuard<'_, BusState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_event_id(&self) -> EventId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn listener_timeout(&self) -> Option<Duration> {
        self.config.listener_timeout()
    }

    fn report_failures(&self, topic: &str, event_id: EventId, failures: &[ListenerFailure]) {
        for failure in failures {
            self.logger.error(
                "listener failed",
                &[
                    ("topic", &topic),
                    ("event_id", &event_id),
                    ("listener", &failure.listener),
                    ("error", &failure.kind),
                ],
            );
        }
        if let Some(metrics) = self.executor.metrics() {
            metrics.inc_listener_failures(u64::try_from(failures.len()).unwrap_or(u64::MAX));
        }
    }

    fn record_outcome(&self, outcome: &EmitOutcome) {
        if let Some(metrics) = self.executor.metrics() {
            metrics.inc_emission(outcome.label());
        }
    }
}

impl<T> Registration for BusInner<T>
where
    T: Send + Sync + 'static,
{
    fn detach(&self, pattern: &str, listener: ListenerId) {
        let mut state = self.lock_state();
        if state.registry.remove(pattern, listener) {
            let remaining = state.registry.count(pattern);
            state.stats.refresh_listener_count(pattern, remaining);
        }
    }

    fn is_attached(&self, pattern: &str, listener: ListenerId) -> bool {
        self.lock_state().registry.contains(pattern, listener)
    }
}

impl<T> BusInner<T>
where
    T: Send + Sync + 'static,
{
    async fn run_emit(
        &self,
        topic: &str,
        payload: T,
        source: Option<String>,
    ) -> EventBusResult<EmitOutcome> {
        if topic.is_empty() {
            return Err(EventBusError::EmptyTopic { operation: "emit" });
        }

        let metadata = EventMetadata {
            id: self.next_event_id(),
            timestamp: Utc::now(),
            topic: topic.to_string(),
            source,
        };

        let stages = self.middleware.snapshot();
        let topic_key: Arc<str> = Arc::from(topic);
        let payload = match middleware::run(&stages, payload, &topic_key).await? {
            PipelineOutcome::Passed(payload) => payload,
            PipelineOutcome::Vetoed { stage } => {
                self.logger.debug(
                    "emission blocked by middleware",
                    &[("topic", &topic), ("stage", &stage)],
                );
                let outcome = EmitOutcome::Vetoed;
                self.record_outcome(&outcome);
                return Ok(outcome);
            }
        };

        let event_id = metadata.id;
        let envelope = Arc::new(EventEnvelope { metadata, payload });
        let (listeners, topic_filters) = {
            let mut state = self.lock_state();
            if self.config.enable_persistence {
                state.history.record(
                    topic,
                    Arc::clone(&envelope),
                    self.config.persistence_limit,
                );
            }
            state.stats.record_emit(topic, envelope.metadata.timestamp);
            (state.registry.resolve(topic), state.filters.snapshot(topic))
        };

        if !filters::passes(&topic_filters, &envelope.payload, &envelope.metadata) {
            self.logger.debug(
                "emission filtered out",
                &[("topic", &topic), ("event_id", &event_id)],
            );
            let outcome = EmitOutcome::Filtered { event_id };
            self.record_outcome(&outcome);
            return Ok(outcome);
        }

        let listeners: Vec<Listener<T>> = listeners
            .into_iter()
            .filter(Listener::claim)
            .collect();
        let listener_count = listeners.len();
        let failures = dispatch::dispatch(listeners, &envelope, self.listener_timeout()).await;
        self.report_failures(topic, event_id, &failures);

        let outcome = EmitOutcome::Delivered(DispatchReport {
            event_id,
            listeners: listener_count,
            failures: failures.len(),
        });
        self.record_outcome(&outcome);
        Ok(outcome)
    }

    async fn run_replay(
        &self,
        topic: &str,
        listener: &Listener<T>,
        limit: Option<usize>,
    ) -> EventBusResult<ReplayOutcome> {
        if topic.is_empty() {
            return Err(EventBusError::EmptyTopic {
                operation: "replay",
            });
        }
        if !self.config.enable_replay {
            self.logger
                .warn("replay is disabled for this bus", &[("topic", &topic)]);
            return Ok(ReplayOutcome::Disabled);
        }

        let entries = self.lock_state().history.entries(topic, limit);
        let delivered = entries.len();
        let mut failures = Vec::new();
        for entry in entries {
            let event_id = entry.id();
            if let Err(failure) =
                dispatch::invoke_one(listener, entry, self.listener_timeout()).await
            {
                self.report_failures(topic, event_id, std::slice::from_ref(&failure));
                failures.push(failure);
            }
        }

        Ok(ReplayOutcome::Replayed {
            delivered,
            failures: failures.len(),
        })
    }
}

/// Typed in-process publish/subscribe bus.
///
/// Cloning is cheap and every clone shares the same registry, history, and
/// middleware. Emission and replay spawn tokio tasks, so they must be awaited
/// inside a tokio runtime.
pub struct EventBus<T> {
    inner: Arc<BusInner<T>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.inner.config)
            .field("middleware", &self.inner.middleware.len())
            .finish_non_exhaustive()
    }
}

impl<T> Default for EventBus<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl<T> EventBus<T>
where
    T: Send + Sync + 'static,
{
    /// Construct a bus that logs through `tracing` and records no metrics.
    ///
    /// `config` is used as given. A zero `persistence_limit` retains no
    /// history and a zero `max_listeners` warns on every subscribe; use
    /// [`EventBus::try_new`] to reject such values.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self::builder(config).build()
    }

    /// Like [`EventBus::new`], but validates `config` first.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::InvalidConfig`] when validation fails.
    pub fn try_new(config: BusConfig) -> EventBusResult<Self> {
        Self::builder(config).try_build()
    }

    /// Start configuring a bus with a custom logger or executor.
    #[must_use]
    pub fn builder(config: BusConfig) -> EventBusBuilder<T> {
        EventBusBuilder {
            config,
            logger: None,
            executor: None,
            _payload: std::marker::PhantomData,
        }
    }

    /// Configuration the bus was built with.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Metrics registry attached through the executor, if any.
    #[must_use]
    pub fn metrics(&self) -> Option<&Metrics> {
        self.inner.executor.metrics()
    }

    fn registration(&self) -> Weak<dyn Registration> {
        let weak: Weak<BusInner<T>> = Arc::downgrade(&self.inner);
        weak
    }

    /// Register `listener` under `pattern`.
    ///
    /// Reaching `max_listeners` on a pattern logs a warning; the listener is
    /// still registered.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::EmptyPattern`] when `pattern` is empty.
    pub fn subscribe(&self, pattern: &str, listener: Listener<T>) -> EventBusResult<Subscription> {
        self.register(pattern, listener, "subscribe")
    }

    fn register(
        &self,
        pattern: &str,
        listener: Listener<T>,
        operation: &'static str,
    ) -> EventBusResult<Subscription> {
        if pattern.is_empty() {
            return Err(EventBusError::EmptyPattern { operation });
        }
        let id = listener.id();
        let count = {
            let mut state = self.inner.lock_state();
            let count = state.registry.add(pattern, listener);
            state.stats.set_listener_count(pattern, count);
            count
        };

        let max_listeners = self.inner.config.max_listeners;
        if count >= max_listeners {
            self.inner.logger.warn(
                "listener count reached the configured maximum",
                &[
                    ("pattern", &pattern),
                    ("listeners", &count),
                    ("max_listeners", &max_listeners),
                ],
            );
        }
        Ok(Subscription::new(pattern, id, self.registration()))
    }

    /// Register `listener` for a single delivery.
    ///
    /// The listener is wrapped in an adapter with its own identity. The first
    /// emission that claims the adapter removes it from the bus and then runs
    /// the wrapped listener, so `listener_count` already excludes it while
    /// that invocation is still in flight. Concurrent emissions that lose
    /// the claim neither invoke nor count it. Use the returned subscription
    /// to cancel it before it fires.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::EmptyPattern`] when `pattern` is empty.
    pub fn subscribe_once(
        &self,
        pattern: &str,
        listener: Listener<T>,
    ) -> EventBusResult<Subscription> {
        let adapter_id = ListenerId::generate();
        let bus = self.registration();
        let key = pattern.to_string();

        let adapter = Listener::from_parts(
            adapter_id,
            Arc::new(
                move |event: Arc<EventEnvelope<T>>| -> BoxFuture<ListenerResult> {
                    if let Some(bus) = bus.upgrade() {
                        bus.detach(&key, adapter_id);
                    }
                    listener.invoke(event)
                },
            ),
        )
        .single_use();
        self.register(pattern, adapter, "subscribe_once")
    }

    /// Remove `listener` from `pattern`. Unknown patterns or listeners are
    /// ignored.
    pub fn unsubscribe(&self, pattern: &str, listener: &Listener<T>) {
        self.inner.detach(pattern, listener.id());
    }

    /// Subscribe a channel-backed stream to `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::EmptyPattern`] when `pattern` is empty.
    pub fn stream(&self, pattern: &str) -> EventBusResult<EventStream<T>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let forward = Listener::from_parts(
            ListenerId::generate(),
            Arc::new(
                move |event: Arc<EventEnvelope<T>>| -> BoxFuture<ListenerResult> {
                    let _ = sender.send(event);
                    Box::pin(async { Ok::<(), BoxError>(()) })
                },
            ),
        );
        let subscription = self.register(pattern, forward, "stream")?;
        Ok(EventStream::new(
            UnboundedReceiverStream::new(receiver),
            subscription,
        ))
    }

    /// Publish `payload` on `topic`.
    ///
    /// Middleware runs first and may transform or veto the payload. The
    /// surviving payload is recorded in history (when enabled) and stats,
    /// then delivered to every matching listener unless a topic filter
    /// rejects it. The call waits for all listeners to settle; listener
    /// failures are logged and counted in the returned report.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::EmptyTopic`] for an empty topic and
    /// [`EventBusError::Middleware`] when a middleware stage fails.
    pub async fn emit(&self, topic: &str, payload: T) -> EventBusResult<EmitOutcome> {
        self.publish(topic, payload, None).await
    }

    /// Publish `payload` on `topic`, tagging the metadata with `source`.
    ///
    /// # Errors
    ///
    /// Same as [`EventBus::emit`].
    pub async fn emit_from(
        &self,
        topic: &str,
        payload: T,
        source: &str,
    ) -> EventBusResult<EmitOutcome> {
        self.publish(topic, payload, Some(source.to_string())).await
    }

    async fn publish(
        &self,
        topic: &str,
        payload: T,
        source: Option<String>,
    ) -> EventBusResult<EmitOutcome> {
        self.inner
            .executor
            .execute(OP_EMIT, self.inner.run_emit(topic, payload, source))
            .await
    }

    /// Append a middleware stage. Stages apply to every topic in
    /// registration order and cannot be removed.
    pub fn use_middleware(&self, middleware: Middleware<T>) {
        self.inner.middleware.push(middleware);
    }

    /// Add a filter for emissions on exactly `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::EmptyTopic`] when `topic` is empty.
    pub fn add_filter(&self, topic: &str, filter: Filter<T>) -> EventBusResult<()> {
        if topic.is_empty() {
            return Err(EventBusError::EmptyTopic {
                operation: "add_filter",
            });
        }
        self.inner.lock_state().filters.add(topic, filter);
        Ok(())
    }

    /// Retained envelopes for `topic`, oldest first, limited to the newest
    /// `limit` when given. Empty when persistence is disabled.
    #[must_use]
    pub fn history(&self, topic: &str, limit: Option<usize>) -> Vec<Arc<EventEnvelope<T>>> {
        self.inner.lock_state().history.entries(topic, limit)
    }

    /// Invoke `listener` once per retained entry for `topic`, oldest first,
    /// one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::EmptyTopic`] when `topic` is empty.
    pub async fn replay(
        &self,
        topic: &str,
        listener: &Listener<T>,
        limit: Option<usize>,
    ) -> EventBusResult<ReplayOutcome> {
        self.inner
            .executor
            .execute(OP_REPLAY, self.inner.run_replay(topic, listener, limit))
            .await
    }

    /// Counters for `topic`; zeroed when the topic was never seen.
    #[must_use]
    pub fn stats(&self, topic: &str) -> TopicStats {
        self.inner.lock_state().stats.get(topic)
    }

    /// Counters for every tracked topic, sorted by key.
    #[must_use]
    pub fn all_stats(&self) -> Vec<TopicStats> {
        self.inner.lock_state().stats.all()
    }

    /// Remove the listeners, filters, and history of `topic`. Its emit
    /// counters are kept with the listener count reset.
    pub fn clear_topic(&self, topic: &str) {
        let mut state = self.inner.lock_state();
        let _ = state.registry.remove_pattern(topic);
        state.filters.remove(topic);
        state.history.remove(topic);
        state.stats.refresh_listener_count(topic, 0);
    }

    /// Reset listeners, filters, history, and stats. Middleware is kept.
    pub fn clear(&self) {
        let mut state = self.inner.lock_state();
        state.registry.clear();
        state.filters.clear();
        state.history.clear();
        state.stats.clear();
    }

    /// Listeners registered under exactly `pattern`.
    #[must_use]
    pub fn listener_count(&self, pattern: &str) -> usize {
        self.inner.lock_state().registry.count(pattern)
    }

    /// Registered pattern keys, sorted.
    #[must_use]
    pub fn topic_names(&self) -> Vec<String> {
        self.inner.lock_state().registry.patterns()
    }
}

/// Builder for [`EventBus`].
pub struct EventBusBuilder<T> {
    config: BusConfig,
    logger: Option<Arc<dyn BusLogger>>,
    executor: Option<OperationExecutor>,
    _payload: std::marker::PhantomData<fn() -> T>,
}

impl<T> EventBusBuilder<T>
where
    T: Send + Sync + 'static,
{
    /// Log through `logger` instead of `tracing`.
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn BusLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Delegate emit and replay to `executor`.
    #[must_use]
    pub fn executor(mut self, executor: OperationExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Finish construction after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::InvalidConfig`] when
    /// [`BusConfig::validate`] fails.
    pub fn try_build(self) -> EventBusResult<EventBus<T>> {
        self.config
            .validate()
            .map_err(|source| EventBusError::InvalidConfig { source })?;
        Ok(self.build())
    }

    /// Finish construction, accepting the configuration as given.
    #[must_use]
    pub fn build(self) -> EventBus<T> {
        let logger = self.logger.unwrap_or_else(|| Arc::new(TracingLogger));
        EventBus {
            inner: Arc::new(BusInner {
                config: self.config,
                state: Mutex::new(BusState::new()),
                middleware: MiddlewarePipeline::new(),
                logger: GuardedLogger::new(logger),
                executor: self.executor.unwrap_or_default(),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

impl<T> fmt::Debug for EventBusBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBusBuilder")
            .field("config", &self.config)
            .field("custom_logger", &self.logger.is_some())
            .field("executor", &self.executor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use tokio::task;
    use tokio::time::timeout;

    const PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

    fn counting(hits: &Arc<AtomicUsize>) -> Listener<u64> {
        let hits = Arc::clone(hits);
        Listener::sync(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[tokio::test]
    async fn sequential_ids_and_history() -> EventBusResult<()> {
        let bus = EventBus::<u64>::new(BusConfig::with_history(16));

        let mut last_id = None;
        for value in 0..5 {
            last_id = bus.emit("progress", value).await?.event_id();
        }
        assert_eq!(last_id, Some(5));

        let ids: Vec<EventId> = bus
            .history("progress", Some(3))
            .iter()
            .map(|entry| entry.id())
            .collect();
        assert_eq!(ids, vec![3, 4, 5]);
        Ok(())
    }

    #[tokio::test]
    async fn vetoed_emissions_still_consume_ids() -> EventBusResult<()> {
        let bus = EventBus::<u64>::default();
        bus.use_middleware(Middleware::map(|value: u64, _| (value != 0).then_some(value)));
        assert_eq!(bus.emit("n", 0).await?, EmitOutcome::Vetoed);
        assert_eq!(bus.emit("n", 1).await?.event_id(), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn load_test_does_not_stall_publishers() -> EventBusResult<()> {
        let bus = EventBus::<u64>::default();
        let mut stream = bus.stream("progress.*")?;

        let publisher = {
            let bus = bus.clone();
            task::spawn(async move {
                for value in 0..500_u64 {
                    let published = timeout(PUBLISH_TIMEOUT, bus.emit("progress.tick", value)).await;
                    assert!(matches!(published, Ok(Ok(_))), "publish stalled");
                }
            })
        };

        let consumer = task::spawn(async move {
            let mut ids = HashSet::new();
            while ids.len() < 500 {
                match stream.recv().await {
                    Some(event) => {
                        ids.insert(event.id());
                    }
                    None => break,
                }
            }
            ids
        });

        assert!(publisher.await.is_ok(), "publisher task panicked");
        let ids = consumer.await.unwrap_or_default();
        assert_eq!(ids.len(), 500);
        Ok(())
    }

    #[tokio::test]
    async fn once_adapter_fires_once_under_concurrent_emits() -> EventBusResult<()> {
        let bus = EventBus::<u64>::default();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.subscribe_once("burst", counting(&hits))?;

        let emits: Vec<_> = (0..16)
            .map(|value| {
                let bus = bus.clone();
                task::spawn(async move { bus.emit("burst", value).await })
            })
            .collect();
        let mut delivered = 0;
        for emit in emits {
            match emit.await {
                Ok(Ok(outcome)) => delivered += outcome.delivered_to(),
                other => panic!("emit failed: {other:?}"),
            }
        }

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(delivered, 1);
        assert_eq!(bus.listener_count("burst"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn wildcard_subscription_does_not_count_against_topic() -> EventBusResult<()> {
        let bus = EventBus::<u64>::default();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.subscribe("user.*", counting(&hits))?;
        bus.emit("user.created", 1).await?;

        assert_eq!(bus.stats("user.created").listener_count, 0);
        assert_eq!(bus.stats("user.created").emit_count, 1);
        assert_eq!(bus.stats("user.*").listener_count, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn dropping_the_bus_ends_streams() -> EventBusResult<()> {
        let bus = EventBus::<u64>::default();
        let mut stream = bus.stream("t")?;
        bus.emit("t", 1).await?;
        drop(bus);
        assert_eq!(stream.recv().await.map(|event| event.payload), Some(1));
        assert!(stream.recv().await.is_none());
        assert!(!stream.subscription().is_active());
        Ok(())
    }
}
