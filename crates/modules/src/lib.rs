//! Module registry for the modular monolith.
//!
//! Every business capability implements [`Module`] and is handed to a
//! [`ModuleRegistry`] at startup. The registry checks the declared dependency
//! graph (duplicates, unknown names, cycles), derives one deterministic
//! initialization order, and runs each module's `initialize` hook strictly
//! after its dependencies are [`ModuleState::Ready`].
//!
//! A module that fails to initialize only takes down the modules that depend
//! on it, transitively; everything else still starts.

pub mod descriptor;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod module;
pub mod registry;
pub mod report;

pub use descriptor::ModuleDescriptor;
pub use error::RegistryError;
pub use lifecycle::{FailureCause, ModuleState};
pub use module::Module;
pub use registry::ModuleRegistry;
pub use report::{FailedModule, InitReport, ModuleStatus};
