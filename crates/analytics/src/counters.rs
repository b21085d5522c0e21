use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use colosseum_events::DomainEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub total: u64,
    pub by_event_type: BTreeMap<String, u64>,
    pub by_namespace: BTreeMap<String, u64>,
    pub last_event_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct EventCounters {
    inner: Mutex<CounterSnapshot>,
}

impl EventCounters {
    pub fn record(&self, event: &DomainEvent) {
        let mut c = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        c.total += 1;
        *c.by_event_type.entry(event.event_type().to_string()).or_default() += 1;
        *c.by_namespace.entry(event.namespace().to_string()).or_default() += 1;
        c.last_event_at = c.last_event_at.max(Some(event.timestamp()));
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
