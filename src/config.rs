//! Configuration & CLI wiring (spec §4.11, ambient).
//!
//! Resolution order for any single run: CLI flags > environment
//! (`SCHEMA_REGISTRY_URL`, `SCHEMA_REGISTRY_BASIC_AUTH_USER_INFO`) > the
//! named profile from `~/.srctl/srctl.yaml` > built-in defaults.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigurationError;

const SCHEMA_REGISTRY_URL_ENV: &str = "SCHEMA_REGISTRY_URL";
const SCHEMA_REGISTRY_BASIC_AUTH_ENV: &str = "SCHEMA_REGISTRY_BASIC_AUTH_USER_INFO";
pub const DEFAULT_TOPIC: &str = "_schemas";
pub const DEFAULT_WORKER_COUNT: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KafkaProfile {
    pub brokers: Vec<String>,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub sasl_mechanism: Option<String>,
    #[serde(default)]
    pub sasl_user: Option<String>,
    #[serde(default)]
    pub sasl_password: Option<String>,
    #[serde(default)]
    pub tls: bool,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryProfile {
    pub url: String,
    #[serde(default)]
    pub basic_auth_user_info: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub kafka: Option<KafkaProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SrctlConfig {
    #[serde(default)]
    pub profiles: HashMap<String, RegistryProfile>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

fn default_worker_count() -> usize {
    DEFAULT_WORKER_COUNT
}

impl SrctlConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".srctl").join("srctl.yaml"))
    }

    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigurationError> {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents).map_err(|error| ConfigurationError::Missing {
            message: format!("failed to parse {}: {error}", path.display()),
        })
    }

    /// Loads `~/.srctl/srctl.yaml` if present; an absent file is not an
    /// error, it simply yields defaults.
    pub fn load_default() -> Result<Self, ConfigurationError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn profile(&self, name: &str) -> Option<&RegistryProfile> {
        self.profiles.get(name)
    }
}

/// Resolves the effective registry URL and basic-auth user-info for one run,
/// given an optional CLI override, an optional named profile, and the
/// process environment.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRegistry {
    pub url: String,
    pub basic_auth_user_info: Option<String>,
    pub context: Option<String>,
}

pub fn resolve_registry(
    cli_url: Option<&str>,
    cli_basic_auth: Option<&str>,
    profile: Option<&RegistryProfile>,
) -> Result<ResolvedRegistry, ConfigurationError> {
    let env_url = std::env::var(SCHEMA_REGISTRY_URL_ENV).ok();
    let env_basic_auth = std::env::var(SCHEMA_REGISTRY_BASIC_AUTH_ENV).ok();

    let url = cli_url
        .map(str::to_string)
        .or(env_url)
        .or_else(|| profile.map(|p| p.url.clone()))
        .ok_or_else(|| ConfigurationError::Missing {
            message: format!(
                "no registry URL: pass --url, set {SCHEMA_REGISTRY_URL_ENV}, or configure a profile"
            ),
        })?;

    let basic_auth_user_info = cli_basic_auth
        .map(str::to_string)
        .or(env_basic_auth)
        .or_else(|| profile.and_then(|p| p.basic_auth_user_info.clone()));

    let context = profile.and_then(|p| p.context.clone());

    Ok(ResolvedRegistry {
        url,
        basic_auth_user_info,
        context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_url_wins_over_profile() {
        let profile = RegistryProfile {
            url: "http://profile:8081".to_string(),
            basic_auth_user_info: None,
            context: None,
            kafka: None,
        };

        let resolved = resolve_registry(Some("http://cli:8081"), None, Some(&profile)).unwrap();
        assert_eq!(resolved.url, "http://cli:8081");
    }

    #[test]
    fn falls_back_to_profile_url() {
        let profile = RegistryProfile {
            url: "http://profile:8081".to_string(),
            basic_auth_user_info: Some("user:pass".to_string()),
            context: None,
            kafka: None,
        };

        let resolved = resolve_registry(None, None, Some(&profile)).unwrap();
        assert_eq!(resolved.url, "http://profile:8081");
        assert_eq!(resolved.basic_auth_user_info.as_deref(), Some("user:pass"));
    }

    #[test]
    fn missing_url_is_an_error() {
        assert!(resolve_registry(None, None, None).is_err());
    }
}
