//! # Service Configuration
//!
//! Read once from the environment at startup:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `PORT` | `8080` | HTTP listen port |
//! | `AUTH_TOKEN` | unset | Shared bearer secret. Unset disables auth. |
//! | `DATABASE_URL` | unset | Postgres URL. Unset means in-memory only. |
//! | `DEALROOM_CATALOG_DIR` | unset | Extra `*.yaml` templates merged over the built-ins |
//! | `DEALROOM_ENTITLED_CONTRACT_TYPES` | unset | Comma-separated allow-list. Unset entitles every type. |
//! | `DEALROOM_METRICS_ENABLED` | `true` | Serve Prometheus metrics at `/metrics` |

use std::path::PathBuf;

use thiserror::Error;

/// Invalid environment value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub reason: String,
}

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Shared bearer secret. `None` disables authentication.
    pub auth_token: Option<String>,
    pub database_url: Option<String>,
    pub catalog_dir: Option<PathBuf>,
    /// `None` entitles every contract type.
    pub entitled_contract_types: Option<Vec<String>>,
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("catalog_dir", &self.catalog_dir)
            .field("entitled_contract_types", &self.entitled_contract_types)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            database_url: None,
            catalog_dir: None,
            entitled_contract_types: None,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError {
                var: "PORT",
                reason: e.to_string(),
            })?,
            None => 8080,
        };
        let metrics_enabled = match get("DEALROOM_METRICS_ENABLED") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError {
                var: "DEALROOM_METRICS_ENABLED",
                reason: format!("expected true or false, got {raw:?}"),
            })?,
            None => true,
        };
        let entitled_contract_types = get("DEALROOM_ENTITLED_CONTRACT_TYPES").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        });

        Ok(Self {
            port,
            auth_token: get("AUTH_TOKEN"),
            database_url: get("DATABASE_URL"),
            catalog_dir: get("DEALROOM_CATALOG_DIR").map(PathBuf::from),
            entitled_contract_types,
            metrics_enabled,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.auth_token.is_none());
        assert!(config.entitled_contract_types.is_none());
        assert!(config.metrics_enabled);
    }

    #[test]
    fn reads_every_variable() {
        let config = from(&[
            ("PORT", "9090"),
            ("AUTH_TOKEN", "s3cret"),
            ("DATABASE_URL", "postgres://localhost/dealroom"),
            ("DEALROOM_CATALOG_DIR", "/etc/dealroom/templates"),
            ("DEALROOM_ENTITLED_CONTRACT_TYPES", "mutual-nda, service-agreement,"),
            ("DEALROOM_METRICS_ENABLED", "off"),
        ])
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.auth_token.as_deref(), Some("s3cret"));
        assert_eq!(
            config.entitled_contract_types,
            Some(vec!["mutual-nda".to_string(), "service-agreement".to_string()])
        );
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn blank_values_are_unset() {
        let config = from(&[("AUTH_TOKEN", "  ")]).unwrap();
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = from(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.var, "PORT");
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = from(&[
            ("AUTH_TOKEN", "super-secret"),
            ("DATABASE_URL", "postgres://user:pw@db/deals"),
        ])
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("pw@db"));
        assert!(debug.contains("[REDACTED]"));
    }
}
