use thiserror::Error;

use colosseum_modules::RegistryError;

use crate::config::ConfigError;

/// Anything that stops the server from coming up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Structural registry problems, or failed modules under strict startup.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
