//! Authorization data models: roles, tenants, and the per-request decision input.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role(pub String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed tenant (organisation) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A tenant id is "unset" when empty or zero-valued.
    ///
    /// Upstream authentication layers commonly default numeric organisation
    /// ids to `0`, so that value never counts as a tenant claim.
    pub fn is_unset(&self) -> bool {
        self.0.is_empty() || self.0 == "0"
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role Set
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered, de-duplicated set of roles held by a caller.
///
/// Order matters: the enforcement loop consults roles in this order and stops
/// at the first grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a role, ignoring duplicates. Returns `true` if the role was new.
    pub fn insert(&mut self, role: Role) -> bool {
        if self.0.contains(&role) {
            return false;
        }
        self.0.push(role);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|r| r.as_str() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Role> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a Role;
    type IntoIter = std::slice::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Role::as_str).collect();
        write!(f, "{}", names.join(","))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Authorization Request
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything a single authorization decision needs, captured once per request.
///
/// `roles` is `None` when the caller context carried no role attribute at all,
/// which is distinct from an attribute that parsed to nothing. Both deny.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub roles: Option<RoleSet>,
    pub method: String,
    pub path: String,
    pub tenant_id: Option<TenantId>,
}

impl AuthorizationRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            roles: None,
            method: method.into(),
            path: path.into(),
            tenant_id: None,
        }
    }

    pub fn with_roles(mut self, roles: RoleSet) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<TenantId>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tenant Scoped Path
// ═══════════════════════════════════════════════════════════════════════════════

/// A request path with its tenant prefix verified and removed.
///
/// Only produced by [`TenantScoper::scope`](super::scope::TenantScoper::scope)
/// after the embedded tenant matched the caller's claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantScopedPath {
    tenant_segment: String,
    residual_path: String,
}

impl TenantScopedPath {
    pub(crate) fn new(tenant_segment: impl Into<String>, residual_path: impl Into<String>) -> Self {
        Self {
            tenant_segment: tenant_segment.into(),
            residual_path: residual_path.into(),
        }
    }

    /// The tenant identifier found in the path.
    pub fn tenant_segment(&self) -> &str {
        &self.tenant_segment
    }

    /// The tenant-agnostic remainder, always starting with `/`.
    pub fn residual_path(&self) -> &str {
        &self.residual_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_set_dedup_preserves_order() {
        let set: RoleSet = ["viewer", "editor", "viewer"]
            .into_iter()
            .map(Role::from)
            .collect();

        assert_eq!(set.len(), 2);
        let names: Vec<&str> = set.iter().map(Role::as_str).collect();
        assert_eq!(names, vec!["viewer", "editor"]);
        assert_eq!(set.to_string(), "viewer,editor");
    }

    #[test]
    fn test_tenant_unset_values() {
        assert!(TenantId::new("").is_unset());
        assert!(TenantId::new("0").is_unset());
        assert!(!TenantId::new("7").is_unset());
        assert!(!TenantId::new("00").is_unset());
    }

    #[test]
    fn test_request_builder() {
        let req = AuthorizationRequest::new("GET", "/v1/organisations/7/users")
            .with_roles(RoleSet::from_iter([Role::from("viewer")]))
            .with_tenant("7");

        assert_eq!(req.tenant_id, Some(TenantId::new("7")));
        assert!(req.roles.as_ref().is_some_and(|r| r.contains("viewer")));
    }
}
