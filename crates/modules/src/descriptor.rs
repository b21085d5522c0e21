use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Static identity and dependency metadata of one module.
///
/// `name` is the registry key. `dependencies` lists the names of modules that
/// must reach `Ready` before this one is initialized, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    name: String,
    version: String,
    base_path: String,
    dependencies: Vec<String>,
}

impl ModuleDescriptor {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            base_path: base_path.into(),
            dependencies: Vec::new(),
        }
    }

    /// Append one dependency.
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Routing prefix the web layer mounts this module under.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidDescriptor(
                "module name must not be empty".to_string(),
            ));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidDescriptor(format!(
                "module name `{}` must not contain whitespace",
                self.name
            )));
        }
        if !self.base_path.starts_with('/') {
            return Err(RegistryError::InvalidDescriptor(format!(
                "module `{}`: base path `{}` must start with '/'",
                self.name, self.base_path
            )));
        }
        Ok(())
    }
}
