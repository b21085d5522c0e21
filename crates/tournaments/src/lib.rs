//! Tournaments module.
//!
//! Only teams announced on `team.team.created` can enter a tournament; the
//! module keeps its own roster of known teams rather than calling into
//! `teams`.

pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;

use colosseum_events::{DomainEvent, EventBus};
use colosseum_modules::{Module, ModuleDescriptor};
use colosseum_web::ModuleRouter;

pub use service::{Tournament, TournamentsService, TEAM_REGISTERED, TOURNAMENT_CREATED};

pub const MODULE_NAME: &str = "tournaments";

const TEAM_CREATED: &str = "team.team.created";

pub struct TournamentsModule {
    descriptor: ModuleDescriptor,
    bus: Arc<EventBus>,
    service: Arc<TournamentsService>,
}

impl TournamentsModule {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            descriptor: ModuleDescriptor::new(
                MODULE_NAME,
                env!("CARGO_PKG_VERSION"),
                "/api/tournaments",
            )
            .depends_on("teams"),
            service: Arc::new(TournamentsService::new(Arc::clone(&bus))),
            bus,
        }
    }

    pub fn service(&self) -> Arc<TournamentsService> {
        Arc::clone(&self.service)
    }
}

#[async_trait]
impl Module<ModuleRouter> for TournamentsModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn router(&self) -> ModuleRouter {
        routes::router(Arc::clone(&self.service))
    }

    fn register_event_handlers(&self) {
        let service = Arc::clone(&self.service);
        self.bus
            .subscribe_fn(TEAM_CREATED, "tournaments.track-team", move |event: Arc<DomainEvent>| {
                let service = Arc::clone(&service);
                async move { service.on_team_created(&event) }
            });
    }
}
