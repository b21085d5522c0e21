//! Process configuration, read from `COLOSSEUM_*` environment variables.

use std::net::SocketAddr;

use thiserror::Error;

use colosseum_observability::{LogConfig, LogFormat, ParseLogFormatError};

pub const BIND_ADDR: &str = "COLOSSEUM_BIND_ADDR";
pub const LOG_FORMAT: &str = "COLOSSEUM_LOG_FORMAT";
pub const LOG_LEVEL: &str = "COLOSSEUM_LOG_LEVEL";
pub const STRICT_STARTUP: &str = "COLOSSEUM_STRICT_STARTUP";
pub const DISABLED_MODULES: &str = "COLOSSEUM_DISABLED_MODULES";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid socket address `{value}`")]
    InvalidBindAddr { var: &'static str, value: String },

    #[error("{var}: {source}")]
    InvalidLogFormat {
        var: &'static str,
        #[source]
        source: ParseLogFormatError,
    },

    #[error("{var}: expected a boolean, got `{value}`")]
    InvalidBool { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log: LogConfig,
    /// Refuse to start if any module ends up `Failed`.
    pub strict_startup: bool,
    /// Modules left out of the registry entirely.
    pub disabled_modules: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log: LogConfig::default(),
            strict_startup: false,
            disabled_modules: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Unset and blank values
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let raw_addr = get(BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = raw_addr.parse().map_err(|_| ConfigError::InvalidBindAddr {
            var: BIND_ADDR,
            value: raw_addr.clone(),
        })?;

        let format = match get(LOG_FORMAT) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|source| ConfigError::InvalidLogFormat { var: LOG_FORMAT, source })?,
            None => LogFormat::default(),
        };
        let mut log = LogConfig {
            format,
            ..LogConfig::default()
        };
        if let Some(level) = get(LOG_LEVEL) {
            log.default_directive = level;
        }

        let strict_startup = match get(STRICT_STARTUP) {
            Some(raw) => parse_bool(STRICT_STARTUP, &raw)?,
            None => false,
        };

        let disabled_modules = get(DISABLED_MODULES)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            log,
            strict_startup,
            disabled_modules,
        })
    }

    pub fn is_disabled(&self, module: &str) -> bool {
        self.disabled_modules.iter().any(|m| m == module)
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(load(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            (BIND_ADDR, "127.0.0.1:9000"),
            (LOG_FORMAT, "pretty"),
            (LOG_LEVEL, "colosseum_events=debug,info"),
            (STRICT_STARTUP, "yes"),
            (DISABLED_MODULES, " analytics, ,notifications "),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.log.default_directive, "colosseum_events=debug,info");
        assert!(config.strict_startup);
        assert_eq!(config.disabled_modules, ["analytics", "notifications"]);
        assert!(config.is_disabled("analytics"));
        assert!(!config.is_disabled("chat"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[(BIND_ADDR, "  "), (STRICT_STARTUP, "")]).unwrap();
        assert_eq!(config.bind_addr, AppConfig::default().bind_addr);
        assert!(!config.strict_startup);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(matches!(
            load(&[(BIND_ADDR, "localhost")]),
            Err(ConfigError::InvalidBindAddr { .. })
        ));
        assert!(matches!(
            load(&[(LOG_FORMAT, "xml")]),
            Err(ConfigError::InvalidLogFormat { .. })
        ));
        assert_eq!(
            load(&[(STRICT_STARTUP, "maybe")]).unwrap_err(),
            ConfigError::InvalidBool {
                var: STRICT_STARTUP,
                value: "maybe".into(),
            }
        );
    }
}
