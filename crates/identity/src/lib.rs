//! Identity module (`iam`): user registration and lookup.
//!
//! Publishes `iam.user.registered`; subscribes to nothing.

pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;

use colosseum_events::EventBus;
use colosseum_modules::{Module, ModuleDescriptor};
use colosseum_web::ModuleRouter;

pub use service::{IdentityService, User, USER_REGISTERED};

pub const MODULE_NAME: &str = "iam";

pub struct IdentityModule {
    descriptor: ModuleDescriptor,
    service: Arc<IdentityService>,
}

impl IdentityModule {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            descriptor: ModuleDescriptor::new(MODULE_NAME, env!("CARGO_PKG_VERSION"), "/api/iam"),
            service: Arc::new(IdentityService::new(bus)),
        }
    }

    pub fn service(&self) -> Arc<IdentityService> {
        Arc::clone(&self.service)
    }
}

#[async_trait]
impl Module<ModuleRouter> for IdentityModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn router(&self) -> ModuleRouter {
        routes::router(Arc::clone(&self.service))
    }
}
