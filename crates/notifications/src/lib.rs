//! Notifications module: per-user inboxes fed entirely by domain events.

pub mod inbox;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;

use colosseum_events::{DomainEvent, EventBus, HandlerResult};
use colosseum_modules::{Module, ModuleDescriptor};
use colosseum_web::ModuleRouter;

pub use inbox::{Notification, NotificationCenter};

pub const MODULE_NAME: &str = "notifications";

pub struct NotificationsModule {
    descriptor: ModuleDescriptor,
    bus: Arc<EventBus>,
    center: Arc<NotificationCenter>,
}

impl NotificationsModule {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            descriptor: ModuleDescriptor::new(
                MODULE_NAME,
                env!("CARGO_PKG_VERSION"),
                "/api/notifications",
            )
            .depends_on("iam"),
            bus,
            center: Arc::new(NotificationCenter::default()),
        }
    }

    pub fn center(&self) -> Arc<NotificationCenter> {
        Arc::clone(&self.center)
    }

    fn on(&self, event_type: &str, name: &str, apply: fn(&NotificationCenter, &DomainEvent) -> HandlerResult) {
        let center = Arc::clone(&self.center);
        self.bus.subscribe_fn(event_type, name, move |event: Arc<DomainEvent>| {
            let center = Arc::clone(&center);
            async move { apply(center.as_ref(), event.as_ref()) }
        });
    }
}

#[async_trait]
impl Module<ModuleRouter> for NotificationsModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn router(&self) -> ModuleRouter {
        routes::router(Arc::clone(&self.center))
    }

    fn register_event_handlers(&self) {
        self.on("iam.user.registered", "notifications.welcome", NotificationCenter::on_user_registered);
        self.on("team.team.created", "notifications.track-owner", NotificationCenter::on_team_created);
        self.on("team.member.joined", "notifications.member-joined", NotificationCenter::on_member_joined);
        self.on("chat.message.sent", "notifications.message", NotificationCenter::on_message_sent);
        self.on(
            "tournament.team.registered",
            "notifications.tournament-entry",
            NotificationCenter::on_tournament_entry,
        );
    }
}
