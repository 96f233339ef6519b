//! Authorization outcomes and the reasons behind them.
//!
//! Callers only ever observe [`Decision::is_allowed`]. The reason exists for
//! logs and metrics and is never sent to the client.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::models::Role;
use super::policy::EnforcementError;
use super::scope::ScopeError;

/// Why a request was allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllowReason {
    /// The caller holds the privileged role.
    PrivilegedBypass,
    /// A policy rule granted one of the caller's roles.
    RoleGranted { role: Role },
    /// The path matched a configured public prefix and a role was granted on the raw path.
    PublicRouteGranted { role: Role },
}

impl AllowReason {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PrivilegedBypass => "privileged_bypass",
            Self::RoleGranted { .. } => "role_granted",
            Self::PublicRouteGranted { .. } => "public_route_granted",
        }
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("no roles present on request")]
    NoRolesPresent,

    #[error("tenant scope check failed: {0}")]
    TenantScopeMismatch(#[from] ScopeError),

    #[error("policy enforcement failed for role {role}: {source}")]
    EnforcementFailure {
        role: Role,
        #[source]
        source: EnforcementError,
    },

    #[error("no role granted {action} on {resource}")]
    NoRoleGranted { resource: String, action: String },
}

impl Denial {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoRolesPresent => "no_roles_present",
            Self::TenantScopeMismatch(_) => "tenant_scope_mismatch",
            Self::EnforcementFailure { .. } => "enforcement_failure",
            Self::NoRoleGranted { .. } => "no_role_granted",
        }
    }

    /// Whether this denial signals a degraded policy engine rather than a
    /// legitimate refusal.
    pub fn is_incident(&self) -> bool {
        matches!(self, Self::EnforcementFailure { .. })
    }
}

/// Result of one authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowReason),
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Self::Deny(denial) => Some(denial),
            Self::Allow(_) => None,
        }
    }

    /// `"allow"` or `"deny"`.
    pub fn outcome(&self) -> &'static str {
        if self.is_allowed() {
            "allow"
        } else {
            "deny"
        }
    }

    /// Reason label, e.g. `"role_granted"` or `"tenant_scope_mismatch"`.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Allow(reason) => reason.label(),
            Self::Deny(denial) => denial.label(),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow(AllowReason::PrivilegedBypass) => write!(f, "allow (privileged role)"),
            Self::Allow(AllowReason::RoleGranted { role })
            | Self::Allow(AllowReason::PublicRouteGranted { role }) => {
                write!(f, "allow (granted to role {})", role)
            }
            Self::Deny(denial) => write!(f, "deny ({})", denial),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_labels() {
        let allow = Decision::Allow(AllowReason::RoleGranted {
            role: Role::new("viewer"),
        });
        assert!(allow.is_allowed());
        assert_eq!(allow.outcome(), "allow");
        assert_eq!(allow.reason(), "role_granted");
        assert!(allow.denial().is_none());

        let deny = Decision::Deny(Denial::NoRolesPresent);
        assert!(deny.is_denied());
        assert_eq!(deny.outcome(), "deny");
        assert_eq!(deny.reason(), "no_roles_present");
    }

    #[test]
    fn test_only_enforcement_failure_is_incident() {
        let failure = Denial::EnforcementFailure {
            role: Role::new("viewer"),
            source: EnforcementError::Engine("boom".into()),
        };
        assert!(failure.is_incident());
        assert!(!Denial::NoRolesPresent.is_incident());
        assert!(!Denial::from(ScopeError::MissingTenant).is_incident());
    }

    #[test]
    fn test_decision_display() {
        let deny = Decision::Deny(Denial::from(ScopeError::TenantMismatch {
            claimed: "9".into(),
            found: "7".into(),
        }));
        assert_eq!(
            deny.to_string(),
            "deny (tenant scope check failed: path addresses tenant 7 but caller claims tenant 9)"
        );
    }
}
