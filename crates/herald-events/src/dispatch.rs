//! Isolated listener invocation.
//!
//! Each invocation runs on its own tokio task so that an error, a panic, or
//! a missed deadline in one listener never reaches the emitter or its
//! siblings.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;

use crate::listener::{Listener, ListenerId};
use crate::payloads::EventEnvelope;

/// Why a listener invocation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FailureKind {
    /// The listener returned an error.
    Errored(String),
    /// The listener panicked.
    Panicked(String),
    /// The listener exceeded the configured deadline.
    TimedOut(Duration),
    /// The runtime cancelled the invocation task.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Errored(message) => write!(f, "listener returned error: {message}"),
            Self::Panicked(message) => write!(f, "listener panicked: {message}"),
            Self::TimedOut(limit) => {
                write!(f, "listener exceeded deadline of {}ms", limit.as_millis())
            }
            Self::Cancelled => f.write_str("listener task was cancelled"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ListenerFailure {
    pub(crate) listener: ListenerId,
    pub(crate) kind: FailureKind,
}

type Invocation = JoinHandle<Result<(), FailureKind>>;

fn spawn_invocation<T>(
    listener: Listener<T>,
    event: Arc<EventEnvelope<T>>,
    deadline: Option<Duration>,
) -> Invocation
where
    T: Send + Sync + 'static,
{
    tokio::spawn(async move {
        let call = listener.invoke(event);
        let result = match deadline {
            Some(limit) => match timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Err(FailureKind::TimedOut(limit)),
            },
            None => call.await,
        };
        result.map_err(|err| FailureKind::Errored(err.to_string()))
    })
}

async fn settle(invocation: Invocation) -> Result<(), FailureKind> {
    match invocation.await {
        Ok(result) => result,
        Err(join_error) => Err(join_failure(join_error)),
    }
}

fn join_failure(join_error: JoinError) -> FailureKind {
    if join_error.is_panic() {
        FailureKind::Panicked(panic_message(join_error.into_panic().as_ref()))
    } else {
        FailureKind::Cancelled
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Start every listener at once, then wait until all have settled.
pub(crate) async fn dispatch<T>(
    listeners: Vec<Listener<T>>,
    event: &Arc<EventEnvelope<T>>,
    deadline: Option<Duration>,
) -> Vec<ListenerFailure>
where
    T: Send + Sync + 'static,
{
    let invocations: Vec<(ListenerId, Invocation)> = listeners
        .into_iter()
        .map(|listener| {
            let id = listener.id();
            (id, spawn_invocation(listener, Arc::clone(event), deadline))
        })
        .collect();

    let mut failures = Vec::new();
    for (listener, invocation) in invocations {
        if let Err(kind) = settle(invocation).await {
            failures.push(ListenerFailure { listener, kind });
        }
    }
    failures
}

/// Run a single listener to completion with the same isolation as dispatch.
pub(crate) async fn invoke_one<T>(
    listener: &Listener<T>,
    event: Arc<EventEnvelope<T>>,
    deadline: Option<Duration>,
) -> Result<(), ListenerFailure>
where
    T: Send + Sync + 'static,
{
    settle(spawn_invocation(listener.clone(), event, deadline))
        .await
        .map_err(|kind| ListenerFailure {
            listener: listener.id(),
            kind,
        })
}
