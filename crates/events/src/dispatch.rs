//! Handle over the handler work started by one `publish`.

use tokio::task::JoinHandle;

/// How a single handler invocation ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Succeeded,
    Failed,
    Panicked,
}

/// The dispatch task spawned for one published event.
///
/// Dropping a `Dispatch` detaches the task; handlers keep running. Publishers
/// that don't care about completion (the normal case) simply ignore it.
#[derive(Debug)]
pub struct Dispatch {
    event_type: String,
    handler_count: usize,
    task: Option<JoinHandle<DispatchSummary>>,
}

/// Tally of a settled [`Dispatch`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl DispatchSummary {
    pub(crate) fn record(&mut self, outcome: HandlerOutcome) {
        match outcome {
            HandlerOutcome::Succeeded => self.succeeded += 1,
            HandlerOutcome::Failed | HandlerOutcome::Panicked => self.failed += 1,
        }
    }
}

impl Dispatch {
    pub(crate) fn new(
        event_type: impl Into<String>,
        handler_count: usize,
        task: JoinHandle<DispatchSummary>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            handler_count,
            task: Some(task),
        }
    }

    pub(crate) fn empty(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            handler_count: 0,
            task: None,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Number of handlers scheduled for this event.
    pub fn handler_count(&self) -> usize {
        self.handler_count
    }

    pub fn is_empty(&self) -> bool {
        self.handler_count == 0
    }

    /// Wait until every handler has finished.
    ///
    /// If the dispatch task could not be joined (aborted by runtime shutdown),
    /// every handler counts as failed.
    pub async fn settled(self) -> DispatchSummary {
        let Some(task) = self.task else {
            return DispatchSummary::default();
        };

        task.await.unwrap_or(DispatchSummary {
            dispatched: self.handler_count,
            succeeded: 0,
            failed: self.handler_count,
        })
    }
}
