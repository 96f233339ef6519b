//! The decision procedure.
//!
//! ```text
//! roles? ──none──▶ deny NoRolesPresent
//!   │
//! privileged? ──yes──▶ allow PrivilegedBypass
//!   │
//! scope(path, tenant) ──err──▶ deny TenantScopeMismatch
//!   │
//! for role in roles: enforce(role, residual, method)
//!   ├─ Ok(true)  ──▶ allow RoleGranted
//!   ├─ Err(e)    ──▶ deny EnforcementFailure (stop)
//!   └─ Ok(false) ──▶ next role
//! exhausted ──▶ deny NoRoleGranted
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use super::decision::{AllowReason, Decision, Denial};
use super::models::{AuthorizationRequest, Role, RoleSet, TenantId};
use super::policy::{EnforcementError, PolicyEngine};
use super::roles::RoleExtractor;
use super::scope::TenantScoper;
use crate::config::AuthzConfig;
use crate::telemetry::metrics::DecisionMetrics;

/// Default upper bound for a single policy engine call.
pub const DEFAULT_ENFORCEMENT_TIMEOUT: Duration = Duration::from_millis(250);

/// Stateless authorization gate shared by all requests.
#[derive(Clone)]
pub struct Authorizer {
    engine: Arc<dyn PolicyEngine>,
    roles: RoleExtractor,
    scoper: TenantScoper,
    public_prefixes: Vec<String>,
    enforcement_timeout: Duration,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("engine", &self.engine.name())
            .field("roles", &self.roles)
            .field("scoper", &self.scoper)
            .field("public_prefixes", &self.public_prefixes)
            .field("enforcement_timeout", &self.enforcement_timeout)
            .finish()
    }
}

impl Authorizer {
    /// Create an authorizer with default role, tenant, and timeout settings.
    pub fn new(engine: Arc<dyn PolicyEngine>) -> Self {
        Self {
            engine,
            roles: RoleExtractor::default(),
            scoper: TenantScoper::default(),
            public_prefixes: Vec::new(),
            enforcement_timeout: DEFAULT_ENFORCEMENT_TIMEOUT,
        }
    }

    /// Create an authorizer from the `[authz]` configuration section.
    pub fn from_config(engine: Arc<dyn PolicyEngine>, config: &AuthzConfig) -> Self {
        Self::new(engine)
            .with_role_extractor(RoleExtractor::new(
                config.role_delimiter.as_str(),
                config.privileged_role.as_str(),
            ))
            .with_scoper(TenantScoper::new(config.tenant_prefix.iter().cloned()))
            .with_public_prefixes(config.public_prefixes.iter().cloned())
            .with_enforcement_timeout(config.enforcement_timeout)
    }

    pub fn with_role_extractor(mut self, roles: RoleExtractor) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_scoper(mut self, scoper: TenantScoper) -> Self {
        self.scoper = scoper;
        self
    }

    /// Paths under these prefixes skip tenant scoping and are enforced on the raw path.
    ///
    /// Tenant-shaped paths are always scoped, even if they fall under a public prefix.
    /// Entries that are empty or `/` once trailing slashes are trimmed are ignored,
    /// since they would match every path.
    pub fn with_public_prefixes(mut self, prefixes: impl IntoIterator<Item = String>) -> Self {
        self.public_prefixes = prefixes
            .into_iter()
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    pub fn with_enforcement_timeout(mut self, timeout: Duration) -> Self {
        self.enforcement_timeout = timeout;
        self
    }

    pub fn role_extractor(&self) -> &RoleExtractor {
        &self.roles
    }

    pub fn scoper(&self) -> &TenantScoper {
        &self.scoper
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Build a request from raw context values as delivered by upstream authentication.
    pub fn build_request(
        &self,
        method: &str,
        path: &str,
        roles: Option<&str>,
        tenant_id: Option<&str>,
    ) -> AuthorizationRequest {
        AuthorizationRequest {
            roles: self.roles.extract(roles),
            method: method.to_string(),
            path: path.to_string(),
            tenant_id: tenant_id.map(TenantId::from),
        }
    }

    /// Decide a request, recording logs and metrics for the outcome.
    pub async fn authorize(&self, request: &AuthorizationRequest) -> Decision {
        let started = Instant::now();
        let decision = match self.evaluate(request).await {
            Ok(reason) => Decision::Allow(reason),
            Err(denial) => Decision::Deny(denial),
        };

        let roles = request
            .roles
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let tenant = request
            .tenant_id
            .as_ref()
            .map(TenantId::as_str)
            .unwrap_or_default();

        match &decision {
            Decision::Allow(reason) => debug!(
                method = %request.method,
                path = %request.path,
                tenant_id = %tenant,
                roles = %roles,
                reason = reason.label(),
                "Request authorized"
            ),
            Decision::Deny(denial) if denial.is_incident() => error!(
                method = %request.method,
                path = %request.path,
                tenant_id = %tenant,
                roles = %roles,
                engine = self.engine.name(),
                error = %denial,
                "Policy enforcement failed, denying request"
            ),
            Decision::Deny(denial) => warn!(
                method = %request.method,
                path = %request.path,
                tenant_id = %tenant,
                roles = %roles,
                reason = denial.label(),
                "Permission denied"
            ),
        }

        DecisionMetrics::record(&decision, started.elapsed());
        decision
    }

    /// Pure decision procedure without logging or metrics.
    pub async fn evaluate(&self, request: &AuthorizationRequest) -> Result<AllowReason, Denial> {
        let roles = match &request.roles {
            Some(roles) if !roles.is_empty() => roles,
            _ => return Err(Denial::NoRolesPresent),
        };

        if self.roles.is_privileged(roles) {
            return Ok(AllowReason::PrivilegedBypass);
        }

        if !self.scoper.is_tenant_scoped(&request.path) && self.is_public(&request.path) {
            let role = self
                .first_granting_role(roles, &request.path, &request.method)
                .await?;
            return Ok(AllowReason::PublicRouteGranted { role });
        }

        let scoped = self
            .scoper
            .scope(&request.path, request.tenant_id.as_ref())?;

        let role = self
            .first_granting_role(roles, scoped.residual_path(), &request.method)
            .await?;
        Ok(AllowReason::RoleGranted { role })
    }

    /// Ask the engine once per role, in order, until one grants.
    ///
    /// An engine error aborts the loop: later roles are not consulted.
    async fn first_granting_role(
        &self,
        roles: &RoleSet,
        resource: &str,
        action: &str,
    ) -> Result<Role, Denial> {
        for role in roles {
            match self.enforce_bounded(role.as_str(), resource, action).await {
                Ok(true) => return Ok(role.clone()),
                Ok(false) => continue,
                Err(source) => {
                    return Err(Denial::EnforcementFailure {
                        role: role.clone(),
                        source,
                    })
                }
            }
        }

        Err(Denial::NoRoleGranted {
            resource: resource.to_string(),
            action: action.to_string(),
        })
    }

    async fn enforce_bounded(
        &self,
        subject: &str,
        object: &str,
        action: &str,
    ) -> Result<bool, EnforcementError> {
        match tokio::time::timeout(
            self.enforcement_timeout,
            self.engine.enforce(subject, object, action),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(EnforcementError::Timeout {
                timeout_ms: self.enforcement_timeout.as_millis() as u64,
            }),
        }
    }

    fn is_public(&self, path: &str) -> bool {
        self.public_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}
