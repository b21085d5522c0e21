//! Application wiring: which modules exist, how they are initialized, and
//! how their routers are mounted.

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use colosseum_analytics::AnalyticsModule;
use colosseum_chat::ChatModule;
use colosseum_events::EventBus;
use colosseum_identity::IdentityModule;
use colosseum_modules::{InitReport, Module, ModuleRegistry};
use colosseum_notifications::NotificationsModule;
use colosseum_teams::TeamsModule;
use colosseum_tournaments::TournamentsModule;
use colosseum_web::ModuleRouter;

use crate::config::AppConfig;
use crate::error::StartupError;

pub mod system;

pub type Registry = ModuleRegistry<ModuleRouter>;

/// A fully initialized application, ready to serve.
pub struct App {
    pub router: Router,
    pub registry: Arc<Registry>,
    pub report: InitReport,
}

/// Every module the application knows about, in registration order.
pub fn all_modules(bus: &Arc<EventBus>) -> Vec<Arc<dyn Module<ModuleRouter>>> {
    vec![
        Arc::new(IdentityModule::new(Arc::clone(bus))),
        Arc::new(TeamsModule::new(Arc::clone(bus))),
        Arc::new(ChatModule::new(Arc::clone(bus))),
        Arc::new(TournamentsModule::new(Arc::clone(bus))),
        Arc::new(AnalyticsModule::new(Arc::clone(bus))),
        Arc::new(NotificationsModule::new(Arc::clone(bus))),
    ]
}

/// Register `modules`, skipping the ones disabled in `config`.
pub fn build_registry(
    config: &AppConfig,
    modules: Vec<Arc<dyn Module<ModuleRouter>>>,
) -> Result<Registry, StartupError> {
    let mut registry = Registry::new();
    for module in modules {
        let name = module.descriptor().name();
        if config.is_disabled(name) {
            tracing::warn!(module = name, "module disabled by configuration");
            continue;
        }
        registry.register_shared(module)?;
    }
    Ok(registry)
}

/// Initialize `registry` and build the HTTP router around it.
pub async fn assemble(config: &AppConfig, mut registry: Registry) -> Result<App, StartupError> {
    let report = registry.initialize_all().await?;
    if config.strict_startup {
        report.ensure_all_ready()?;
    }

    let mut router = Router::new();
    for (base_path, module_router) in registry.ready_routers() {
        router = router.nest(&base_path, module_router);
    }

    let registry = Arc::new(registry);
    let router = router
        .route("/health", get(system::health))
        .route("/modules", get(system::modules))
        .layer(ServiceBuilder::new().layer(Extension(Arc::clone(&registry))));

    Ok(App {
        router,
        registry,
        report,
    })
}

/// Build the full application on `bus` (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig, bus: Arc<EventBus>) -> Result<App, StartupError> {
    let registry = build_registry(config, all_modules(&bus))?;
    assemble(config, registry).await
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use colosseum_modules::{FailureCause, ModuleDescriptor, RegistryError};

    use super::*;

    struct Broken(ModuleDescriptor);

    #[async_trait]
    impl Module<ModuleRouter> for Broken {
        fn descriptor(&self) -> &ModuleDescriptor {
            &self.0
        }

        async fn initialize(&self) -> anyhow::Result<()> {
            anyhow::bail!("storage unavailable")
        }

        fn router(&self) -> ModuleRouter {
            Router::new()
        }
    }

    fn broken_iam() -> Arc<dyn Module<ModuleRouter>> {
        Arc::new(Broken(ModuleDescriptor::new("iam", "0.0.0", "/api/iam")))
    }

    /// Subscribes, then fails.
    struct HalfStarted {
        descriptor: ModuleDescriptor,
        bus: Arc<EventBus>,
    }

    #[async_trait]
    impl Module<ModuleRouter> for HalfStarted {
        fn descriptor(&self) -> &ModuleDescriptor {
            &self.descriptor
        }

        async fn initialize(&self) -> anyhow::Result<()> {
            self.register_event_handlers();
            anyhow::bail!("cache warmup failed")
        }

        fn router(&self) -> ModuleRouter {
            Router::new()
        }

        fn register_event_handlers(&self) {
            self.bus
                .subscribe_fn("iam.user.registered", "half-started", |_event| async { Ok(()) });
        }
    }

    #[tokio::test]
    async fn every_module_becomes_ready() {
        let app = build_app(&AppConfig::default(), Arc::new(EventBus::new()))
            .await
            .unwrap();
        assert!(app.report.all_ready());
        assert_eq!(app.registry.len(), 6);
        assert_eq!(
            app.report.order,
            ["iam", "teams", "chat", "tournaments", "analytics", "notifications"]
        );
    }

    #[tokio::test]
    async fn failed_dependency_cascades_without_aborting_startup() {
        let bus = Arc::new(EventBus::new());
        let mut modules = all_modules(&bus);
        modules[0] = broken_iam();

        let registry = build_registry(&AppConfig::default(), modules).unwrap();
        let app = assemble(&AppConfig::default(), registry).await.unwrap();

        let failed: Vec<&str> = app.report.failed.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, ["iam", "teams", "chat", "tournaments", "notifications"]);
        assert_eq!(app.report.ready, ["analytics"]);
        assert_eq!(
            app.registry.state("teams").and_then(|s| s.failure()),
            Some(&FailureCause::DependencyFailed {
                dependency: "iam".into()
            })
        );
    }

    #[tokio::test]
    async fn strict_startup_refuses_failed_modules() {
        let bus = Arc::new(EventBus::new());
        let mut modules = all_modules(&bus);
        modules[0] = broken_iam();
        let config = AppConfig {
            strict_startup: true,
            ..AppConfig::default()
        };

        let registry = build_registry(&config, modules).unwrap();
        let err = assemble(&config, registry).await.err().unwrap();
        assert!(matches!(
            err,
            StartupError::Registry(RegistryError::ModulesFailed { ref modules }) if modules.len() == 5
        ));
    }

    #[test]
    fn shared_base_path_is_rejected_before_mounting() {
        let modules: Vec<Arc<dyn Module<ModuleRouter>>> = vec![
            Arc::new(Broken(ModuleDescriptor::new("a", "0.0.0", "/api/x"))),
            Arc::new(Broken(ModuleDescriptor::new("b", "0.0.0", "/api/x"))),
        ];
        let err = build_registry(&AppConfig::default(), modules).err().unwrap();
        assert!(matches!(
            err,
            StartupError::Registry(RegistryError::DuplicateBasePath { ref path, .. }) if path == "/api/x"
        ));
    }

    #[tokio::test]
    async fn handlers_of_a_failed_module_stay_subscribed() {
        let bus = Arc::new(EventBus::new());
        let modules: Vec<Arc<dyn Module<ModuleRouter>>> = vec![Arc::new(HalfStarted {
            descriptor: ModuleDescriptor::new("half", "0.0.0", "/api/half"),
            bus: Arc::clone(&bus),
        })];

        let registry = build_registry(&AppConfig::default(), modules).unwrap();
        let app = assemble(&AppConfig::default(), registry).await.unwrap();

        assert!(app.registry.state("half").is_some_and(|s| s.is_failed()));
        assert!(app.registry.ready_routers().is_empty());
        assert_eq!(bus.handler_count("iam.user.registered"), 1);
    }

    #[tokio::test]
    async fn disabling_a_dependency_is_a_structural_error() {
        let config = AppConfig {
            disabled_modules: vec!["teams".into()],
            ..AppConfig::default()
        };
        let err = build_app(&config, Arc::new(EventBus::new())).await.err().unwrap();
        assert!(matches!(
            err,
            StartupError::Registry(RegistryError::UnknownDependency { ref dependency, .. }) if dependency == "teams"
        ));
    }

    #[tokio::test]
    async fn disabling_a_leaf_module_is_fine() {
        let config = AppConfig {
            disabled_modules: vec!["analytics".into()],
            ..AppConfig::default()
        };
        let app = build_app(&config, Arc::new(EventBus::new())).await.unwrap();
        assert_eq!(app.registry.len(), 5);
        assert!(app.registry.module("analytics").is_none());
    }
}
