//! Configuration loading and management
//!
//! ```yaml
//! server:
//!   bind: 0.0.0.0:5000
//! api:
//!   baseUrl: http://localhost:5000/api
//!   timeoutSecs: 10
//! users:
//!   - username: admin
//!     name: Admin
//!     role: admin
//!     password: admin123
//! ```
//!
//! `DYEHOUSE_BIND` and `DYEHOUSE_API_URL` override the file.

use crate::core::role::Role;
use crate::core::user::NewUser;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const BIND_ENV: &str = "DYEHOUSE_BIND";
pub const API_URL_ENV: &str = "DYEHOUSE_API_URL";

/// Where the server listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

/// Where clients find the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub api: ApiConfig,

    /// Accounts created at startup
    pub users: Vec<NewUser>,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply `DYEHOUSE_*` environment overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.trim().is_empty()) {
            self.server.bind = bind.trim().to_string();
        }
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url.trim().trim_end_matches('/').to_string();
        }
        self
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://")) {
            bail!("api.baseUrl must be an http(s) URL, got '{}'", self.api.base_url);
        }
        if self.api.timeout_secs == 0 {
            bail!("api.timeoutSecs must be greater than zero");
        }
        for user in &self.users {
            user.check()
                .with_context(|| format!("seed user '{}'", user.username))?;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("server.bind '{}' is not a socket address", self.server.bind))
    }

    /// Demo accounts, one per role
    pub fn demo_users() -> Vec<NewUser> {
        [
            ("admin", "Admin", Role::Admin, "admin123", "Management"),
            ("operator", "Olivia Operator", Role::Operator, "operator123", "Production"),
            ("factory", "Frank Factory", Role::Factory, "factory123", "Factory Floor"),
            ("sales", "Sam Sales", Role::Sales, "sales123", "Sales"),
        ]
        .into_iter()
        .map(|(username, name, role, password, department)| NewUser {
            username: username.to_string(),
            name: name.to_string(),
            role,
            password: password.to_string(),
            email: None,
            department: Some(department.to_string()),
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert_eq!(config.api.base_url, "http://localhost:5000/api");
        assert!(config.users.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let config = AppConfig::from_yaml_str("server:\n  bind: 0.0.0.0:8080\n")
            .unwrap()
            .with_overrides(|key| match key {
                BIND_ENV => Some("127.0.0.1:9000".into()),
                API_URL_ENV => Some("http://orders.local/api/".into()),
                _ => None,
            });
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.api.base_url, "http://orders.local/api");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let config = AppConfig::default().with_overrides(|_| Some("  ".into()));
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.server.bind = "localhost".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.api.base_url = "ftp://x".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_demo_users_are_valid() {
        let users = AppConfig::demo_users();
        assert_eq!(users.len(), Role::all().len());
        assert!(users.iter().all(|u| u.check().is_ok()));
    }
}
