//! Chat module: one channel per team, membership mirrored from team events.
//!
//! Channels are never created over HTTP. `team.team.created` and
//! `team.member.joined` may be handled in either order, so both paths
//! get-or-create the team's channel.

pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;

use colosseum_events::{DomainEvent, EventBus};
use colosseum_modules::{Module, ModuleDescriptor};
use colosseum_web::ModuleRouter;

pub use service::{Channel, ChatService, Message, MESSAGE_SENT};

pub const MODULE_NAME: &str = "chat";

const TEAM_CREATED: &str = "team.team.created";
const MEMBER_JOINED: &str = "team.member.joined";

pub struct ChatModule {
    descriptor: ModuleDescriptor,
    bus: Arc<EventBus>,
    service: Arc<ChatService>,
}

impl ChatModule {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            descriptor: ModuleDescriptor::new(MODULE_NAME, env!("CARGO_PKG_VERSION"), "/api/chat")
                .with_dependencies(["iam", "teams"]),
            service: Arc::new(ChatService::new(Arc::clone(&bus))),
            bus,
        }
    }

    pub fn service(&self) -> Arc<ChatService> {
        Arc::clone(&self.service)
    }
}

#[async_trait]
impl Module<ModuleRouter> for ChatModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn router(&self) -> ModuleRouter {
        routes::router(Arc::clone(&self.service))
    }

    fn register_event_handlers(&self) {
        let service = Arc::clone(&self.service);
        self.bus
            .subscribe_fn(TEAM_CREATED, "chat.open-channel", move |event: Arc<DomainEvent>| {
                let service = Arc::clone(&service);
                async move { service.on_team_created(&event) }
            });

        let service = Arc::clone(&self.service);
        self.bus
            .subscribe_fn(MEMBER_JOINED, "chat.add-member", move |event: Arc<DomainEvent>| {
                let service = Arc::clone(&service);
                async move { service.on_member_joined(&event) }
            });
    }
}
