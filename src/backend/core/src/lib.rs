#![allow(clippy::result_large_err)]
//! # Warden Core
//!
//! Tenant-scoped, role-based authorization for multi-tenant HTTP APIs.
//!
//! ## Architecture
//!
//! - **Authz**: role extraction, tenant scoping, pluggable policy engines and the decision procedure
//! - **API**: axum router with health, metrics and the authorization gate
//! - **Config**: layered file + environment configuration
//! - **Telemetry**: structured logging and Prometheus decision metrics

pub mod api;
pub mod authz;
pub mod config;
pub mod error;
pub mod telemetry;

pub use error::{ErrorCode, ErrorSeverity, Result, WardenError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::authz::{
        AllowReason, AuthorizationRequest, AuthorizeLayer, AuthorizedRequest, Authorizer,
        CallerContext, CasbinPolicyEngine, Decision, Denial, EnforcementError,
        MemoryPolicyEngine, PolicyEngine, PolicyRule, Role, RoleExtractor, RoleSet, ScopeError,
        TenantId, TenantScopedPath, TenantScoper,
    };
    pub use crate::config::Config;
    pub use crate::error::{ErrorCode, Result, WardenError};
}
