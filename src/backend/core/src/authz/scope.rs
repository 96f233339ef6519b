//! Tenant scoping: verify the tenant embedded in a request path and strip it.
//!
//! Tenant-owned resources live under `/v1/organisations/{tenant}/...`. Before a
//! path reaches the policy engine the scoper checks that `{tenant}` equals the
//! caller's claimed tenant and rewrites the path into its tenant-agnostic
//! form, so a single policy rule such as `(viewer, /users, GET)` covers every
//! organisation.
//!
//! ```text
//! /v1/organisations/7/users/42   claimed = 7   →  residual /users/42
//! /v1/organisations/7/users/42   claimed = 9   →  TenantMismatch
//! /v1/health                     claimed = 7   →  NotTenantScoped
//! ```

use thiserror::Error;

use super::models::{TenantId, TenantScopedPath};

/// Default path segments preceding the tenant identifier.
pub const DEFAULT_TENANT_PREFIX: [&str; 2] = ["v1", "organisations"];

/// Reasons a path could not be scoped to the caller's tenant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("no tenant claimed for this request")]
    MissingTenant,

    #[error("path is not tenant-scoped: {path}")]
    NotTenantScoped { path: String },

    #[error("path addresses tenant {found} but caller claims tenant {claimed}")]
    TenantMismatch { claimed: String, found: String },
}

/// Extracts and validates the tenant segment of request paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScoper {
    prefix: Vec<String>,
}

impl TenantScoper {
    /// Create a scoper for paths shaped `/{prefix...}/{tenant}/...`.
    pub fn new<I, S>(prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: prefix.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// Index of the tenant segment once the path is split on `/`.
    ///
    /// Segment 0 is the empty string before the leading slash.
    fn tenant_index(&self) -> usize {
        self.prefix.len() + 1
    }

    /// Whether `path` has the tenant-scoped shape, regardless of who claims it.
    pub fn is_tenant_scoped(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('/').collect();
        self.matches_shape(&segments)
    }

    fn matches_shape(&self, segments: &[&str]) -> bool {
        segments.len() > self.tenant_index()
            && segments[0].is_empty()
            && self
                .prefix
                .iter()
                .zip(&segments[1..])
                .all(|(expected, actual)| expected == actual)
    }

    /// Scope `path` to `claimed`.
    ///
    /// Succeeds only when the path is tenant-shaped and its tenant segment is
    /// exactly equal to the claim. No normalisation is applied to either side.
    pub fn scope(
        &self,
        path: &str,
        claimed: Option<&TenantId>,
    ) -> Result<TenantScopedPath, ScopeError> {
        let claimed = match claimed {
            Some(tenant) if !tenant.is_unset() => tenant,
            _ => return Err(ScopeError::MissingTenant),
        };

        let segments: Vec<&str> = path.split('/').collect();
        if !self.matches_shape(&segments) {
            return Err(ScopeError::NotTenantScoped {
                path: path.to_string(),
            });
        }

        let index = self.tenant_index();
        let found = segments[index];
        if found != claimed.as_str() {
            return Err(ScopeError::TenantMismatch {
                claimed: claimed.to_string(),
                found: found.to_string(),
            });
        }

        let residual = format!("/{}", segments[index + 1..].join("/"));
        Ok(TenantScopedPath::new(found, residual))
    }

    /// The path prefix owned by `tenant`, e.g. `/v1/organisations/7`.
    pub fn tenant_root(&self, tenant: &TenantId) -> String {
        let mut root = String::new();
        for segment in &self.prefix {
            root.push('/');
            root.push_str(segment);
        }
        root.push('/');
        root.push_str(tenant.as_str());
        root
    }
}

impl Default for TenantScoper {
    fn default() -> Self {
        Self::new(DEFAULT_TENANT_PREFIX)
    }
}
