//! Configuration management.
//!
//! Values come from an optional file layered under `WARDEN__`-prefixed
//! environment variables, e.g. `WARDEN__AUTHZ__ENFORCEMENT_TIMEOUT=500ms`.
//! List keys take comma-separated values:
//! `WARDEN__AUTHZ__PUBLIC_PREFIXES=/v1/catalog,/v1/status`.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::authz::{PolicyRule, DEFAULT_ROLE_DELIMITER, DEFAULT_TENANT_PREFIX, PRIVILEGED_ROLE};
use crate::error::{Result, WardenError};
use crate::telemetry::TelemetryConfig;

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Decision procedure settings
    #[serde(default)]
    pub authz: AuthzConfig,

    /// Which policy engine to build and where its rules come from
    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub observability: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
    /// Role that bypasses tenant scoping and policy checks
    #[serde(default = "default_privileged_role")]
    pub privileged_role: String,

    /// Separator between role names in the caller's role attribute
    #[serde(default = "default_role_delimiter")]
    pub role_delimiter: String,

    /// Path segments preceding the tenant id
    #[serde(default = "default_tenant_prefix")]
    pub tenant_prefix: Vec<String>,

    /// Upper bound for a single policy engine call
    #[serde(default = "default_enforcement_timeout", with = "humantime_serde")]
    pub enforcement_timeout: Duration,

    /// Non-tenant paths enforced on the raw path. Empty means every
    /// non-tenant path is denied.
    #[serde(default)]
    pub public_prefixes: Vec<String>,

    /// Read caller identity from request headers. Only enable behind a
    /// gateway that strips these headers from client traffic.
    #[serde(default)]
    pub trust_identity_headers: bool,

    #[serde(default = "default_roles_header")]
    pub roles_header: String,

    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            privileged_role: default_privileged_role(),
            role_delimiter: default_role_delimiter(),
            tenant_prefix: default_tenant_prefix(),
            enforcement_timeout: default_enforcement_timeout(),
            public_prefixes: Vec::new(),
            trust_identity_headers: false,
            roles_header: default_roles_header(),
            tenant_header: default_tenant_header(),
        }
    }
}

/// Policy engine backend.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyBackend {
    /// In-process rule table seeded from `policy.rules`
    #[default]
    Memory,
    /// Casbin enforcer loaded from `model_path` and `policy_path`
    Casbin,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub backend: PolicyBackend,

    /// Casbin model file
    pub model_path: Option<PathBuf>,

    /// Casbin CSV policy file
    pub policy_path: Option<PathBuf>,

    /// Inline rules for the memory backend
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_privileged_role() -> String { PRIVILEGED_ROLE.to_string() }
fn default_role_delimiter() -> String { DEFAULT_ROLE_DELIMITER.to_string() }
fn default_tenant_prefix() -> Vec<String> { DEFAULT_TENANT_PREFIX.iter().map(|s| s.to_string()).collect() }
fn default_enforcement_timeout() -> Duration { Duration::from_millis(250) }
fn default_roles_header() -> String { "x-warden-roles".to_string() }
fn default_tenant_header() -> String { "x-warden-tenant".to_string() }

/// `WARDEN__SECTION__KEY` variables, with comma-separated list keys.
fn environment() -> config::Environment {
    config::Environment::with_prefix("WARDEN")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("authz.tenant_prefix")
        .with_list_parse_key("authz.public_prefixes")
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment())
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with the environment layered on top.
    pub fn from_file(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(environment())
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the authorizer cannot run with.
    pub fn validate(&self) -> Result<()> {
        let authz = &self.authz;

        if authz.role_delimiter.is_empty() {
            return Err(WardenError::invalid_config("authz.role_delimiter must not be empty"));
        }
        if authz.privileged_role.trim().is_empty() {
            return Err(WardenError::invalid_config("authz.privileged_role must not be empty"));
        }
        if authz.tenant_prefix.is_empty() || authz.tenant_prefix.iter().any(|s| s.is_empty()) {
            return Err(WardenError::invalid_config(
                "authz.tenant_prefix must contain at least one non-empty segment",
            ));
        }
        if let Some(prefix) = authz
            .public_prefixes
            .iter()
            .find(|p| !p.starts_with('/') || p.trim_end_matches('/').is_empty())
        {
            return Err(WardenError::invalid_config(format!(
                "authz.public_prefixes entry {:?} must be an absolute path other than /",
                prefix
            )));
        }
        if authz.enforcement_timeout.is_zero() {
            return Err(WardenError::invalid_config("authz.enforcement_timeout must be positive"));
        }
        if authz.trust_identity_headers
            && (authz.roles_header.is_empty() || authz.tenant_header.is_empty())
        {
            return Err(WardenError::invalid_config(
                "authz.roles_header and authz.tenant_header are required when trusting identity headers",
            ));
        }
        if self.policy.backend == PolicyBackend::Casbin
            && (self.policy.model_path.is_none() || self.policy.policy_path.is_none())
        {
            return Err(WardenError::invalid_config(
                "policy.model_path and policy.policy_path are required for the casbin backend",
            ));
        }

        Ok(())
    }
}
