//! Tenant-scoped, role-based request authorization.
//!
//! This module provides:
//! - **Models**: roles, tenant ids, and the per-request [`AuthorizationRequest`]
//! - **Role Extractor**: parses role attributes and detects the privileged role
//! - **Tenant Scoper**: validates `/v1/organisations/{tenant}/...` paths against the claimed tenant
//! - **Policy Engines**: the [`PolicyEngine`] trait with in-memory and Casbin implementations
//! - **Authorizer**: the decision procedure combining all of the above
//! - **Middleware**: a tower layer turning denials into `403 Forbidden`
//!
//! # Usage
//!
//! ```rust,ignore
//! use warden_core::authz::{Authorizer, AuthorizeLayer, MemoryPolicyEngine, PolicyRule};
//!
//! let engine = MemoryPolicyEngine::with_rules([PolicyRule::new("viewer", "/users", "GET")]);
//! let authorizer = Arc::new(Authorizer::new(Arc::new(engine)));
//!
//! let request = authorizer.build_request("GET", "/v1/organisations/7/users", Some("viewer"), Some("7"));
//! assert!(authorizer.authorize(&request).await.is_allowed());
//!
//! let app = Router::new()
//!     .route("/v1/organisations/:org/users", get(list_users))
//!     .layer(AuthorizeLayer::new(authorizer));
//! ```

pub mod authorizer;
pub mod casbin_engine;
pub mod decision;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod roles;
pub mod scope;

pub use authorizer::{Authorizer, DEFAULT_ENFORCEMENT_TIMEOUT};
pub use casbin_engine::{CasbinPolicyEngine, DEFAULT_MODEL};
pub use decision::{AllowReason, Decision, Denial};
pub use middleware::{
    identity_from_headers, AuthorizeLayer, AuthorizeService, AuthorizedRequest, CallerContext,
    IdentityHeaders,
};
pub use models::{AuthorizationRequest, Role, RoleSet, TenantId, TenantScopedPath};
pub use policy::{EnforcementError, MemoryPolicyEngine, PolicyEngine, PolicyRule};
pub use roles::{RoleExtractor, DEFAULT_ROLE_DELIMITER, PRIVILEGED_ROLE};
pub use scope::{ScopeError, TenantScoper, DEFAULT_TENANT_PREFIX};
