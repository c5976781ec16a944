//! Ordered, append-only middleware pipeline.
//!
//! # Design
//! - Stages run strictly one after another; each observes the previous
//!   stage's output.
//! - The first veto stops the pipeline. A stage error fails the emission.
//! - Callers snapshot the stage list, so registration during an emission only
//!   affects later emissions.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{EventBusError, EventBusResult};
use crate::listener::Middleware;

/// Result of running a payload through the pipeline.
#[derive(Debug)]
pub(crate) enum PipelineOutcome<T> {
    /// Every stage passed; carries the transformed payload.
    Passed(T),
    /// The stage at this index vetoed the payload.
    Vetoed { stage: usize },
}

pub(crate) struct MiddlewarePipeline<T> {
    stages: RwLock<Vec<Middleware<T>>>,
}

impl<T> MiddlewarePipeline<T> {
    pub(crate) const fn new() -> Self {
        Self {
            stages: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, middleware: Middleware<T>) {
        self.stages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(middleware);
    }

    pub(crate) fn snapshot(&self) -> Vec<Middleware<T>> {
        self.stages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.stages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Fold `payload` through `stages` in order.
pub(crate) async fn run<T>(
    stages: &[Middleware<T>],
    mut payload: T,
    topic: &Arc<str>,
) -> EventBusResult<PipelineOutcome<T>> {
    for (stage, middleware) in stages.iter().enumerate() {
        match middleware.apply(payload, Arc::clone(topic)).await {
            Ok(Some(next)) => payload = next,
            Ok(None) => return Ok(PipelineOutcome::Vetoed { stage }),
            Err(source) => {
                return Err(EventBusError::Middleware {
                    topic: topic.to_string(),
                    stage,
                    source,
                });
            }
        }
    }
    Ok(PipelineOutcome::Passed(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn topic() -> Arc<str> {
        Arc::from("numbers")
    }

    #[tokio::test]
    async fn stages_apply_in_registration_order() -> EventBusResult<()> {
        let pipeline = MiddlewarePipeline::new();
        pipeline.push(Middleware::map(|value: i64, _| Some(value + 1)));
        pipeline.push(Middleware::map(|value: i64, _| Some(value * 2)));
        assert_eq!(pipeline.len(), 2);

        match run(&pipeline.snapshot(), 5, &topic()).await? {
            PipelineOutcome::Passed(value) => assert_eq!(value, 12),
            PipelineOutcome::Vetoed { stage } => panic!("unexpected veto at {stage}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn async_stages_are_sequential() -> EventBusResult<()> {
        let pipeline = MiddlewarePipeline::new();
        pipeline.push(Middleware::new(|value: Vec<u8>, _| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let mut value = value;
            value.push(1);
            Ok::<_, BoxError>(Some(value))
        }));
        pipeline.push(Middleware::new(|value: Vec<u8>, _| async move {
            let mut value = value;
            value.push(2);
            Ok::<_, BoxError>(Some(value))
        }));

        match run(&pipeline.snapshot(), Vec::new(), &topic()).await? {
            PipelineOutcome::Passed(value) => assert_eq!(value, vec![1, 2]),
            PipelineOutcome::Vetoed { stage } => panic!("unexpected veto at {stage}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn veto_stops_later_stages() -> EventBusResult<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pipeline = MiddlewarePipeline::new();
        pipeline.push(Middleware::map(|_: i64, _| None));
        pipeline.push(Middleware::map(move |value: i64, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(value)
        }));

        let outcome = run(&pipeline.snapshot(), 1, &topic()).await?;
        assert!(matches!(outcome, PipelineOutcome::Vetoed { stage: 0 }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn stage_error_is_reported_with_position() {
        let pipeline = MiddlewarePipeline::new();
        pipeline.push(Middleware::map(|value: i64, _| Some(value)));
        pipeline.push(Middleware::new(|_: i64, _| async {
            let rejected: BoxError = Box::new(io::Error::other("rejected"));
            Err::<Option<i64>, _>(rejected)
        }));

        let err = run(&pipeline.snapshot(), 1, &topic()).await.err();
        match err {
            Some(EventBusError::Middleware { topic, stage, .. }) => {
                assert_eq!(topic, "numbers");
                assert_eq!(stage, 1);
            }
            other => panic!("expected middleware error, got {other:?}"),
        }
    }
}
