use thiserror::Error;

/// Structural registry failures.
///
/// These are programmer errors (bad wiring), detected before any module runs.
/// Per-module initialization failures are not errors at this level; they are
/// captured in [`crate::ModuleState::Failed`] and the [`crate::InitReport`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("module `{name}` is already registered")]
    DuplicateModule { name: String },

    #[error("module `{module}` uses base path `{path}`, already taken by `{existing}`")]
    DuplicateBasePath {
        path: String,
        existing: String,
        module: String,
    },

    #[error("invalid module descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("module `{module}` depends on unregistered module `{dependency}`")]
    UnknownDependency { module: String, dependency: String },

    #[error("cyclic module dependency: {}", cycle_path(.modules))]
    CyclicDependency { modules: Vec<String> },

    #[error("modules are already initialized")]
    AlreadyInitialized,

    #[error("module `{module}` cannot move from {from} to {to}")]
    InvalidTransition {
        module: String,
        from: &'static str,
        to: &'static str,
    },

    /// Raised only when the application escalates partial failure
    /// (see [`crate::InitReport::ensure_all_ready`]).
    #[error("{} module(s) failed to initialize: {}", .modules.len(), .modules.join(", "))]
    ModulesFailed { modules: Vec<String> },
}

fn cycle_path(modules: &[String]) -> String {
    match modules.first() {
        Some(first) => format!("{} -> {}", modules.join(" -> "), first),
        None => String::new(),
    }
}
