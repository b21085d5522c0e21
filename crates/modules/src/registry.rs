//! The module registry: registration, validation, and ordered initialization.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::graph::resolve_order;
use crate::{
    FailedModule, FailureCause, InitReport, Module, ModuleDescriptor, ModuleState, ModuleStatus,
    RegistryError,
};

struct Entry<R> {
    module: Arc<dyn Module<R>>,
    state: ModuleState,
}

/// Owns every registered module and drives its lifecycle.
///
/// Written only during startup (`register`, then a single `initialize_all`);
/// read-only afterwards, which is why mutation goes through `&mut self`
/// instead of interior locking.
pub struct ModuleRegistry<R> {
    entries: Vec<Entry<R>>,
    index: HashMap<String, usize>,
    initialized: bool,
}

impl<R: 'static> ModuleRegistry<R> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            initialized: false,
        }
    }

    /// Add a module in state `Registered`.
    ///
    /// Dependencies are not checked here, so modules may be registered in any
    /// order. A duplicate name or base path is rejected and the module is not
    /// added.
    pub fn register<M>(&mut self, module: M) -> Result<(), RegistryError>
    where
        M: Module<R>,
    {
        self.register_shared(Arc::new(module))
    }

    pub fn register_shared(&mut self, module: Arc<dyn Module<R>>) -> Result<(), RegistryError> {
        if self.initialized {
            return Err(RegistryError::AlreadyInitialized);
        }

        let descriptor = module.descriptor();
        descriptor.validate()?;

        let name = descriptor.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateModule { name });
        }
        if let Some(existing) = self
            .entries
            .iter()
            .map(|e| e.module.descriptor())
            .find(|d| d.base_path() == descriptor.base_path())
        {
            return Err(RegistryError::DuplicateBasePath {
                path: descriptor.base_path().to_string(),
                existing: existing.name().to_string(),
                module: name,
            });
        }

        info!(
            module = %name,
            version = descriptor.version(),
            base_path = descriptor.base_path(),
            dependencies = ?descriptor.dependencies(),
            "module registered"
        );

        self.index.insert(name, self.entries.len());
        self.entries.push(Entry {
            module,
            state: ModuleState::Registered,
        });
        Ok(())
    }

    /// Validate the dependency graph and return the order `initialize_all`
    /// would use, without running anything.
    pub fn initialization_order(&self) -> Result<Vec<String>, RegistryError> {
        let order = self.resolve()?;
        Ok(order.into_iter().map(|i| self.name_at(i).to_string()).collect())
    }

    /// Initialize every module in dependency order.
    ///
    /// Structural problems (unknown dependency, cycle) fail the whole call
    /// before any module runs. After that, failures are per module: a module
    /// whose hook errors or panics is `Failed`, every module depending on it
    /// (transitively) is `Failed` without its hook being called, and all
    /// other modules still initialize. May only succeed once.
    pub async fn initialize_all(&mut self) -> Result<InitReport, RegistryError> {
        if self.initialized {
            return Err(RegistryError::AlreadyInitialized);
        }

        let order = self.resolve()?;
        self.initialized = true;

        let mut report = InitReport {
            order: order.iter().map(|&i| self.name_at(i).to_string()).collect(),
            ..InitReport::default()
        };
        info!(order = ?report.order, "initializing modules");

        for idx in order {
            let module = Arc::clone(&self.entries[idx].module);
            let descriptor = module.descriptor();
            let name = descriptor.name();

            if let Some(dependency) = self.first_unready_dependency(descriptor) {
                warn!(module = name, dependency = %dependency, "skipping module: dependency failed");
                let cause = FailureCause::DependencyFailed { dependency };
                self.entries[idx]
                    .state
                    .transition(name, ModuleState::Failed { cause: cause.clone() })?;
                report.failed.push(FailedModule {
                    name: name.to_string(),
                    cause,
                });
                continue;
            }

            self.entries[idx].state.transition(name, ModuleState::Initializing)?;

            let outcome = AssertUnwindSafe(module.initialize()).catch_unwind().await;
            let next = match outcome {
                Ok(Ok(())) => {
                    info!(module = name, version = descriptor.version(), "module ready");
                    ModuleState::Ready
                }
                Ok(Err(err)) => {
                    let message = format!("{err:#}");
                    error!(module = name, error = %message, "module initialization failed");
                    ModuleState::Failed {
                        cause: FailureCause::Initialization { message },
                    }
                }
                Err(panic) => {
                    let message = format!("panicked: {}", panic_message(panic.as_ref()));
                    error!(module = name, error = %message, "module initialization panicked");
                    ModuleState::Failed {
                        cause: FailureCause::Initialization { message },
                    }
                }
            };

            if let ModuleState::Failed { cause } = &next {
                report.failed.push(FailedModule {
                    name: name.to_string(),
                    cause: cause.clone(),
                });
            } else {
                report.ready.push(name.to_string());
            }
            self.entries[idx].state.transition(name, next)?;
        }

        info!(
            ready = report.ready.len(),
            failed = report.failed.len(),
            "module initialization finished"
        );
        Ok(report)
    }

    pub fn module(&self, name: &str) -> Option<Arc<dyn Module<R>>> {
        self.entry(name).map(|e| Arc::clone(&e.module))
    }

    /// Routing handle of `name`, whatever its state.
    pub fn router(&self, name: &str) -> Option<R> {
        self.entry(name).map(|e| e.module.router())
    }

    /// `(base_path, router)` for every `Ready` module, in registration order.
    pub fn ready_routers(&self) -> Vec<(String, R)> {
        self.entries
            .iter()
            .filter(|e| e.state.is_ready())
            .map(|e| (e.module.descriptor().base_path().to_string(), e.module.router()))
            .collect()
    }

    /// Descriptors in registration order.
    pub fn list_modules(&self) -> Vec<ModuleDescriptor> {
        self.entries
            .iter()
            .map(|e| e.module.descriptor().clone())
            .collect()
    }

    pub fn state(&self, name: &str) -> Option<&ModuleState> {
        self.entry(name).map(|e| &e.state)
    }

    pub fn statuses(&self) -> Vec<ModuleStatus> {
        self.entries
            .iter()
            .map(|e| ModuleStatus {
                descriptor: e.module.descriptor().clone(),
                state: e.state.clone(),
            })
            .collect()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&Entry<R>> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    fn name_at(&self, idx: usize) -> &str {
        self.entries[idx].module.descriptor().name()
    }

    fn resolve(&self) -> Result<Vec<usize>, RegistryError> {
        resolve_order(self.entries.iter().map(|e| e.module.descriptor()))
    }

    fn first_unready_dependency(&self, descriptor: &ModuleDescriptor) -> Option<String> {
        descriptor
            .dependencies()
            .iter()
            .find(|dep| !self.state(dep).is_some_and(ModuleState::is_ready))
            .cloned()
    }
}

impl<R: 'static> Default for ModuleRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: 'static> core::fmt::Debug for ModuleRegistry<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field(
                "modules",
                &self
                    .entries
                    .iter()
                    .map(|e| (e.module.descriptor().name(), e.state.label()))
                    .collect::<Vec<_>>(),
            )
            .field("initialized", &self.initialized)
            .finish()
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

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use proptest::prelude::*;

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct TestModule {
        descriptor: ModuleDescriptor,
        behaviour: Behaviour,
        log: Log,
    }

    impl TestModule {
        fn new(name: &str, deps: &[&str], log: &Log) -> Self {
            Self {
                descriptor: ModuleDescriptor::new(name, "0.1.0", format!("/api/{name}"))
                    .with_dependencies(deps.iter().copied()),
                behaviour: Behaviour::Succeed,
                log: Arc::clone(log),
            }
        }

        fn behaving(mut self, behaviour: Behaviour) -> Self {
            self.behaviour = behaviour;
            self
        }
    }

    #[async_trait]
    impl Module<String> for TestModule {
        fn descriptor(&self) -> &ModuleDescriptor {
            &self.descriptor
        }

        async fn initialize(&self) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(self.descriptor.name().to_string());
            match self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail => Err(anyhow::anyhow!("connection refused")),
                Behaviour::Panic => panic!("init exploded"),
            }
        }

        fn router(&self) -> String {
            format!("router:{}", self.descriptor.name())
        }
    }

    fn log() -> Log {
        Arc::default()
    }

    fn calls(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn initializes_in_dependency_order_regardless_of_registration_order() {
        let log = log();
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        registry.register(TestModule::new("c", &["b"], &log)).unwrap();
        registry.register(TestModule::new("a", &[], &log)).unwrap();
        registry.register(TestModule::new("b", &["a"], &log)).unwrap();

        let report = registry.initialize_all().await.unwrap();

        assert_eq!(calls(&log), ["a", "b", "c"]);
        assert_eq!(report.order, ["a", "b", "c"]);
        assert_eq!(report.ready, ["a", "b", "c"]);
        assert!(report.all_ready());
        for name in ["a", "b", "c"] {
            assert_eq!(registry.state(name), Some(&ModuleState::Ready));
        }
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected_and_not_added() {
        let log = log();
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        registry.register(TestModule::new("iam", &[], &log)).unwrap();

        let err = registry
            .register(TestModule::new("iam", &["teams"], &log))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateModule { name: "iam".into() });
        assert_eq!(registry.len(), 1);
        assert!(registry.list_modules()[0].dependencies().is_empty());
    }

    #[test]
    fn duplicate_base_path_is_rejected_and_not_added() {
        let log = log();
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        let mut first = TestModule::new("a", &[], &log);
        first.descriptor = ModuleDescriptor::new("a", "0.1.0", "/api/x");
        let mut second = TestModule::new("b", &[], &log);
        second.descriptor = ModuleDescriptor::new("b", "0.1.0", "/api/x");

        registry.register(first).unwrap();
        let err = registry.register(second).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateBasePath {
                path: "/api/x".into(),
                existing: "a".into(),
                module: "b".into(),
            }
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.module("b").is_none());
    }

    #[tokio::test]
    async fn cycle_fails_before_any_module_runs() {
        let log = log();
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        registry.register(TestModule::new("standalone", &[], &log)).unwrap();
        registry.register(TestModule::new("a", &["b"], &log)).unwrap();
        registry.register(TestModule::new("b", &["a"], &log)).unwrap();

        let err = registry.initialize_all().await.unwrap_err();
        assert_eq!(
            err,
            RegistryError::CyclicDependency {
                modules: vec!["a".into(), "b".into()],
            }
        );
        assert!(calls(&log).is_empty());
        assert!(!registry.is_initialized());
        assert_eq!(registry.state("a"), Some(&ModuleState::Registered));
    }

    #[tokio::test]
    async fn unknown_dependency_is_structural() {
        let log = log();
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        registry.register(TestModule::new("chat", &["iam"], &log)).unwrap();

        let err = registry.initialize_all().await.unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownDependency {
                module: "chat".into(),
                dependency: "iam".into(),
            }
        );
        assert!(calls(&log).is_empty());
    }

    #[tokio::test]
    async fn failure_cascades_to_dependents_only() {
        let log = log();
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        registry
            .register(TestModule::new("iam", &[], &log).behaving(Behaviour::Fail))
            .unwrap();
        registry.register(TestModule::new("teams", &["iam"], &log)).unwrap();
        registry.register(TestModule::new("chat", &["teams"], &log)).unwrap();
        registry.register(TestModule::new("analytics", &[], &log)).unwrap();

        let report = registry.initialize_all().await.unwrap();

        // dependents of the failed module never had their hook called
        assert_eq!(calls(&log), ["iam", "analytics"]);
        assert_eq!(report.ready, ["analytics"]);
        assert_eq!(
            report.failed,
            vec![
                FailedModule {
                    name: "iam".into(),
                    cause: FailureCause::Initialization {
                        message: "connection refused".into(),
                    },
                },
                FailedModule {
                    name: "teams".into(),
                    cause: FailureCause::DependencyFailed {
                        dependency: "iam".into(),
                    },
                },
                FailedModule {
                    name: "chat".into(),
                    cause: FailureCause::DependencyFailed {
                        dependency: "teams".into(),
                    },
                },
            ]
        );
        assert_eq!(registry.state("analytics"), Some(&ModuleState::Ready));
        assert!(registry.state("chat").unwrap().is_failed());
        assert_eq!(
            report.ensure_all_ready().unwrap_err(),
            RegistryError::ModulesFailed {
                modules: vec!["iam".into(), "teams".into(), "chat".into()],
            }
        );
    }

    #[tokio::test]
    async fn panicking_hook_is_captured_as_failure() {
        let log = log();
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        registry
            .register(TestModule::new("iam", &[], &log).behaving(Behaviour::Panic))
            .unwrap();
        registry.register(TestModule::new("teams", &["iam"], &log)).unwrap();

        let report = registry.initialize_all().await.unwrap();

        assert_eq!(calls(&log), ["iam"]);
        match registry.state("iam").and_then(ModuleState::failure) {
            Some(FailureCause::Initialization { message }) => {
                assert_eq!(message, "panicked: init exploded")
            }
            other => panic!("unexpected state: {other:?}"),
        }
        assert_eq!(report.failed.len(), 2);
    }

    #[tokio::test]
    async fn second_initialize_all_is_rejected() {
        let log = log();
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        registry.register(TestModule::new("iam", &[], &log)).unwrap();

        registry.initialize_all().await.unwrap();
        assert_eq!(
            registry.initialize_all().await.unwrap_err(),
            RegistryError::AlreadyInitialized
        );
        assert_eq!(calls(&log), ["iam"]);

        let err = registry
            .register(TestModule::new("late", &[], &log))
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyInitialized);
    }

    #[tokio::test]
    async fn accessors_expose_descriptors_and_routers() {
        let log = log();
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        registry
            .register(TestModule::new("iam", &[], &log).behaving(Behaviour::Fail))
            .unwrap();
        registry.register(TestModule::new("analytics", &[], &log)).unwrap();

        assert_eq!(
            registry.initialization_order().unwrap(),
            ["iam", "analytics"]
        );
        registry.initialize_all().await.unwrap();

        assert_eq!(registry.router("iam").as_deref(), Some("router:iam"));
        assert!(registry.router("missing").is_none());
        assert!(registry.module("analytics").is_some());
        assert_eq!(
            registry.ready_routers(),
            vec![("/api/analytics".to_string(), "router:analytics".to_string())]
        );

        let names: Vec<String> = registry
            .list_modules()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, ["iam", "analytics"]);

        let statuses = serde_json::to_value(registry.statuses()).unwrap();
        assert_eq!(statuses[0]["name"], "iam");
        assert_eq!(statuses[0]["status"], "failed");
        assert_eq!(statuses[1]["basePath"], "/api/analytics");
        assert_eq!(statuses[1]["status"], "ready");
    }

    #[test]
    fn invalid_descriptor_is_rejected_on_register() {
        let log = log();
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        let err = registry.register(TestModule::new("", &[], &log)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDescriptor(_)));
        assert!(registry.is_empty());
    }

    fn run(registry: &mut ModuleRegistry<String>) -> Result<InitReport, RegistryError> {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(registry.initialize_all())
    }

    /// `deps[i]` only ever points at lower indices, so the graph is acyclic.
    fn dag() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<usize>)> {
        (1usize..8)
            .prop_flat_map(|n| {
                (
                    prop::collection::vec(prop::collection::vec(any::<bool>(), n), n),
                    Just((0..n).collect::<Vec<usize>>()).prop_shuffle(),
                )
            })
            .prop_map(|(edges, registration)| {
                let deps = edges
                    .iter()
                    .enumerate()
                    .map(|(i, row)| (0..i).filter(|&j| row[j]).collect())
                    .collect();
                (deps, registration)
            })
    }

    fn name(i: usize) -> String {
        format!("m{i}")
    }

    fn build(deps: &[Vec<usize>], registration: &[usize], log: &Log) -> ModuleRegistry<String> {
        let mut registry: ModuleRegistry<String> = ModuleRegistry::new();
        for &i in registration {
            let dep_names: Vec<String> = deps[i].iter().map(|&d| name(d)).collect();
            let dep_refs: Vec<&str> = dep_names.iter().map(String::as_str).collect();
            registry
                .register(TestModule::new(&name(i), &dep_refs, log))
                .unwrap();
        }
        registry
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: every module of an acyclic graph is initialized exactly
        /// once, after all of its dependencies.
        #[test]
        fn acyclic_graphs_initialize_each_module_once_after_its_dependencies(
            (deps, registration) in dag()
        ) {
            let log = log();
            let mut registry = build(&deps, &registration, &log);

            let report = run(&mut registry).unwrap();
            let seen = calls(&log);

            prop_assert_eq!(seen.len(), deps.len());
            prop_assert_eq!(report.ready.len(), deps.len());
            for (i, module_deps) in deps.iter().enumerate() {
                let pos = seen.iter().position(|n| *n == name(i));
                prop_assert!(pos.is_some());
                let pos = pos.unwrap_or_default();
                prop_assert_eq!(seen.iter().filter(|n| **n == name(i)).count(), 1);
                for &d in module_deps {
                    let dep_pos = seen.iter().position(|n| *n == name(d)).unwrap_or(usize::MAX);
                    prop_assert!(dep_pos < pos);
                }
            }
        }

        /// Property: closing a dependency chain into a loop always fails
        /// before any module is initialized.
        #[test]
        fn cyclic_graphs_initialize_nothing(
            (deps, registration) in dag()
        ) {
            let n = deps.len();
            let mut deps = deps;
            // chain m(n-1) -> ... -> m0, then m0 -> m(n-1)
            for i in 1..n {
                if !deps[i].contains(&(i - 1)) {
                    deps[i].push(i - 1);
                }
            }
            deps[0].push(n - 1);

            let log = log();
            let mut registry = build(&deps, &registration, &log);

            let err = run(&mut registry).unwrap_err();
            prop_assert!(
                matches!(err, RegistryError::CyclicDependency { ref modules } if !modules.is_empty()),
                "unexpected error: {:?}", err
            );
            prop_assert!(calls(&log).is_empty());
            for i in 0..n {
                prop_assert_eq!(registry.state(&name(i)), Some(&ModuleState::Registered));
            }
        }
    }
}
