//! Teams module: team creation and membership.
//!
//! Publishes `team.team.created` and `team.member.joined`. Listens to
//! `iam.user.registered` to remember usernames for member listings.

pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;

use colosseum_events::{DomainEvent, EventBus};
use colosseum_modules::{Module, ModuleDescriptor};
use colosseum_web::ModuleRouter;

pub use service::{Member, Team, TeamsService, MEMBER_JOINED, TEAM_CREATED};

pub const MODULE_NAME: &str = "teams";

const USER_REGISTERED: &str = "iam.user.registered";

pub struct TeamsModule {
    descriptor: ModuleDescriptor,
    bus: Arc<EventBus>,
    service: Arc<TeamsService>,
}

impl TeamsModule {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            descriptor: ModuleDescriptor::new(MODULE_NAME, env!("CARGO_PKG_VERSION"), "/api/teams")
                .depends_on("iam"),
            service: Arc::new(TeamsService::new(Arc::clone(&bus))),
            bus,
        }
    }

    pub fn service(&self) -> Arc<TeamsService> {
        Arc::clone(&self.service)
    }
}

#[async_trait]
impl Module<ModuleRouter> for TeamsModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn router(&self) -> ModuleRouter {
        routes::router(Arc::clone(&self.service))
    }

    fn register_event_handlers(&self) {
        let service = Arc::clone(&self.service);
        self.bus
            .subscribe_fn(USER_REGISTERED, "teams.remember-user", move |event: Arc<DomainEvent>| {
                let service = Arc::clone(&service);
                async move { service.on_user_registered(&event) }
            });
    }
}
