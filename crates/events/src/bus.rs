//! Process-wide publish/subscribe dispatcher keyed by event type.
//!
//! ## Contract
//!
//! - **Additive subscriptions**: `subscribe` only ever appends. Subscribing the
//!   same handler twice means two invocations per publish.
//! - **Silent without subscribers**: publishing an event nobody listens to is a no-op.
//! - **Fire-and-forget**: `publish` spawns one dispatch task for the event and
//!   returns immediately; it never waits on, or reports, handler outcomes.
//! - **Isolated failures**: every handler runs behind its own boundary. An error
//!   or a panic is logged with the event type and aggregate id, and does not
//!   affect sibling handlers or the publisher.
//! - **Deterministic start order**: the dispatch task polls every handler for
//!   the first time in registration order, whatever the scheduler flavor.
//!   Handlers then run concurrently; completion order is unspecified.
//!
//! ## Locking
//!
//! The subscription map is written during module initialization and read on
//! every publish. `publish` takes the read lock only long enough to clone the
//! handler list, so no lock is held while handlers run.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use crate::dispatch::{Dispatch, DispatchSummary, HandlerOutcome};
use crate::handler::{EventHandler, FnHandler, HandlerResult};
use crate::DomainEvent;

type HandlerList = Vec<Arc<dyn EventHandler>>;

static GLOBAL: OnceLock<Arc<EventBus>> = OnceLock::new();

pub struct EventBus {
    handlers: RwLock<HashMap<String, HandlerList>>,
    runtime: Option<Handle>,
}

impl EventBus {
    /// Empty bus that dispatches on whichever Tokio runtime `publish` is called from.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            runtime: None,
        }
    }

    /// Empty bus that always dispatches on `runtime`, so it can be published to
    /// from threads outside any runtime.
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            runtime: Some(runtime),
        }
    }

    /// The process-scoped bus, created empty on first access.
    pub fn global() -> Arc<EventBus> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(EventBus::new())))
    }

    pub fn subscribe(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let event_type = event_type.into();
        debug!(event_type = %event_type, handler = handler.name(), "subscribed");

        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    /// Subscribe an async closure under a diagnostic `name`.
    pub fn subscribe_fn<F, Fut>(&self, event_type: impl Into<String>, name: impl Into<String>, f: F)
    where
        F: Fn(Arc<DomainEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.subscribe(event_type, Arc::new(FnHandler::new(name, f)));
    }

    /// Schedule every handler registered for `event.event_type()` and return
    /// without waiting for them.
    ///
    /// All handlers share one spawned task: separate spawns would start in
    /// scheduler order, not registration order.
    pub fn publish(&self, event: DomainEvent) -> Dispatch {
        let handlers = self.handlers_for(event.event_type());
        if handlers.is_empty() {
            return Dispatch::empty(event.event_type());
        }

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            error!(
                event_type = event.event_type(),
                aggregate_id = event.aggregate_id(),
                handlers = handlers.len(),
                "no async runtime available; event not dispatched"
            );
            return Dispatch::empty(event.event_type());
        };

        let event_type = event.event_type().to_string();
        let handler_count = handlers.len();
        let event = Arc::new(event);
        let task = runtime.spawn(async move {
            let mut running: FuturesUnordered<_> = handlers
                .into_iter()
                .map(|handler| run_isolated(handler, Arc::clone(&event)))
                .collect();

            let mut summary = DispatchSummary {
                dispatched: handler_count,
                ..DispatchSummary::default()
            };
            while let Some(outcome) = running.next().await {
                summary.record(outcome);
            }
            summary
        });

        Dispatch::new(event_type, handler_count, task)
    }

    /// Number of handlers currently subscribed to `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Event types with at least one subscriber, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        types.sort();
        types
    }

    /// Drop every subscription. Only meant for test isolation.
    pub fn clear(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn handlers_for(&self, event_type: &str) -> HandlerList {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = handlers
            .iter()
            .map(|(event_type, list)| (event_type.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("handlers", &counts)
            .field("pinned_runtime", &self.runtime.is_some())
            .finish()
    }
}

async fn run_isolated(handler: Arc<dyn EventHandler>, event: Arc<DomainEvent>) -> HandlerOutcome {
    let invocation = AssertUnwindSafe(async { handler.handle(Arc::clone(&event)).await });

    match invocation.catch_unwind().await {
        Ok(Ok(())) => HandlerOutcome::Succeeded,
        Ok(Err(err)) => {
            warn!(
                event_type = event.event_type(),
                aggregate_id = event.aggregate_id(),
                event_id = %event.event_id(),
                handler = handler.name(),
                error = %format!("{err:#}"),
                "event handler failed"
            );
            HandlerOutcome::Failed
        }
        Err(panic) => {
            error!(
                event_type = event.event_type(),
                aggregate_id = event.aggregate_id(),
                event_id = %event.event_id(),
                handler = handler.name(),
                panic = panic_message(panic.as_ref()),
                "event handler panicked"
            );
            HandlerOutcome::Panicked
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
