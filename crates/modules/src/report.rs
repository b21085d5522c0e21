use serde::Serialize;

use crate::{FailureCause, ModuleDescriptor, ModuleState, RegistryError};

/// One module's descriptor and current lifecycle state, for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    #[serde(flatten)]
    pub descriptor: ModuleDescriptor,
    #[serde(flatten)]
    pub state: ModuleState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedModule {
    pub name: String,
    pub cause: FailureCause,
}

/// Outcome of [`crate::ModuleRegistry::initialize_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitReport {
    /// Every module, in the order it was visited.
    pub order: Vec<String>,
    pub ready: Vec<String>,
    pub failed: Vec<FailedModule>,
}

impl InitReport {
    pub fn all_ready(&self) -> bool {
        self.failed.is_empty()
    }

    /// Escalate partial failure into an error, for applications that refuse
    /// to run with any module down.
    pub fn ensure_all_ready(&self) -> Result<(), RegistryError> {
        if self.all_ready() {
            return Ok(());
        }
        Err(RegistryError::ModulesFailed {
            modules: self.failed.iter().map(|f| f.name.clone()).collect(),
        })
    }
}
