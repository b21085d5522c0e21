//! Analytics module: counts domain events by type and by namespace.
//!
//! It subscribes by event-type string only and has no crate dependency on the
//! modules whose events it counts.

pub mod counters;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;

use colosseum_events::{DomainEvent, EventBus};
use colosseum_modules::{Module, ModuleDescriptor};
use colosseum_web::ModuleRouter;

pub use counters::{CounterSnapshot, EventCounters};

pub const MODULE_NAME: &str = "analytics";

/// Event types counted when no explicit list is given.
pub const DEFAULT_TRACKED_EVENTS: &[&str] = &[
    "iam.user.registered",
    "team.team.created",
    "team.member.joined",
    "chat.message.sent",
    "tournament.tournament.created",
    "tournament.team.registered",
];

pub struct AnalyticsModule {
    descriptor: ModuleDescriptor,
    bus: Arc<EventBus>,
    tracked: Vec<String>,
    counters: Arc<EventCounters>,
}

impl AnalyticsModule {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self::with_tracked_events(bus, DEFAULT_TRACKED_EVENTS.iter().copied())
    }

    pub fn with_tracked_events<I, S>(bus: Arc<EventBus>, tracked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            descriptor: ModuleDescriptor::new(MODULE_NAME, env!("CARGO_PKG_VERSION"), "/api/analytics"),
            bus,
            tracked: tracked.into_iter().map(Into::into).collect(),
            counters: Arc::new(EventCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<EventCounters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl Module<ModuleRouter> for AnalyticsModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn router(&self) -> ModuleRouter {
        routes::router(Arc::clone(&self.counters))
    }

    fn register_event_handlers(&self) {
        for event_type in &self.tracked {
            let counters = Arc::clone(&self.counters);
            self.bus
                .subscribe_fn(event_type.as_str(), "analytics.count", move |event: Arc<DomainEvent>| {
                    let counters = Arc::clone(&counters);
                    async move {
                        counters.record(&event);
                        Ok(())
                    }
                });
        }
        tracing::debug!(tracked = self.tracked.len(), "analytics subscribed");
    }
}
