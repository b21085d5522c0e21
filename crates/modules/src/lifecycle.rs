//! Module lifecycle state machine.
//!
//! ```text
//! Registered ──► Initializing ──► Ready
//!     │               │
//!     │               └─────────► Failed (initialization error)
//!     └─────────────────────────► Failed (dependency failed; hook never runs)
//! ```
//!
//! `Ready` and `Failed` are terminal. Nothing is retried automatically.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::error::RegistryError;

/// Why a module ended up `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureCause {
    #[error("initialization failed: {message}")]
    Initialization { message: String },

    #[error("dependency `{dependency}` failed")]
    DependencyFailed { dependency: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ModuleState {
    Registered,
    Initializing,
    Ready,
    Failed { cause: FailureCause },
}

impl ModuleState {
    pub fn label(&self) -> &'static str {
        match self {
            ModuleState::Registered => "registered",
            ModuleState::Initializing => "initializing",
            ModuleState::Ready => "ready",
            ModuleState::Failed { .. } => "failed",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModuleState::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ModuleState::Failed { .. })
    }

    pub fn is_terminal(&self) -> bool {
        self.is_ready() || self.is_failed()
    }

    pub fn failure(&self) -> Option<&FailureCause> {
        match self {
            ModuleState::Failed { cause } => Some(cause),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: &ModuleState) -> bool {
        match (self, next) {
            (ModuleState::Registered, ModuleState::Initializing) => true,
            (
                ModuleState::Registered,
                ModuleState::Failed {
                    cause: FailureCause::DependencyFailed { .. },
                },
            ) => true,
            (ModuleState::Initializing, ModuleState::Ready) => true,
            (ModuleState::Initializing, ModuleState::Failed { .. }) => true,
            _ => false,
        }
    }

    /// Move `module` to `next`, rejecting anything outside the state diagram.
    pub(crate) fn transition(&mut self, module: &str, next: ModuleState) -> Result<(), RegistryError> {
        if !self.can_transition_to(&next) {
            return Err(RegistryError::InvalidTransition {
                module: module.to_string(),
                from: self.label(),
                to: next.label(),
            });
        }

        debug!(module, from = self.label(), to = next.label(), "module state changed");
        *self = next;
        Ok(())
    }
}
