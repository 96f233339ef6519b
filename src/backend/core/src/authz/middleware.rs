//! Axum authorization middleware.
//!
//! [`AuthorizeLayer`] reads the [`CallerContext`] placed in request extensions
//! by upstream authentication, asks the [`Authorizer`] for a decision and
//! either forwards the request or answers `403 Forbidden` with an empty body.
//! The denial reason is logged, never returned to the client.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::authorizer::Authorizer;
use super::decision::{AllowReason, Decision};
use super::models::TenantId;
use crate::error::{ErrorCode, WardenError};

/// Header carrying a caller-supplied request id, echoed into the decision span.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// ═══════════════════════════════════════════════════════════════════════════════
// Caller Context (inserted upstream)
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity attributes established by authentication before this layer runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    /// Delimiter-joined role names, e.g. `"viewer,editor"`.
    pub roles: Option<String>,
    /// The tenant the caller's credentials belong to.
    pub tenant_id: Option<String>,
}

impl CallerContext {
    pub fn new(roles: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            roles: Some(roles.into()),
            tenant_id: Some(tenant_id.into()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Authorized Request (extracted in handlers)
// ═══════════════════════════════════════════════════════════════════════════════

/// Inserted into request extensions after an allow decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizedRequest {
    pub tenant_id: Option<TenantId>,
    /// Tenant-agnostic path, present when the request was tenant-scoped.
    pub residual_path: Option<String>,
    pub reason: AllowReason,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthorizedRequest
where
    S: Send + Sync,
{
    type Rejection = WardenError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthorizedRequest>()
            .cloned()
            .ok_or_else(|| {
                WardenError::new(
                    ErrorCode::MissingAuthorization,
                    "Authorization context not available. Ensure AuthorizeLayer is applied.",
                )
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer that gates every request through an [`Authorizer`].
///
/// # Example
///
/// ```rust,ignore
/// let authorizer = Arc::new(Authorizer::new(Arc::new(engine)));
///
/// let app = Router::new()
///     .route("/v1/organisations/:org/users", get(list_users))
///     .layer(AuthorizeLayer::new(authorizer));
/// ```
#[derive(Clone)]
pub struct AuthorizeLayer {
    authorizer: Arc<Authorizer>,
}

impl AuthorizeLayer {
    pub fn new(authorizer: Arc<Authorizer>) -> Self {
        Self { authorizer }
    }
}

impl<S> Layer<S> for AuthorizeLayer {
    type Service = AuthorizeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizeService {
            inner,
            authorizer: self.authorizer.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Service that authorizes each request before handing it to `inner`.
#[derive(Clone)]
pub struct AuthorizeService<S> {
    inner: S,
    authorizer: Arc<Authorizer>,
}

impl<S> Service<Request<Body>> for AuthorizeService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let authorizer = self.authorizer.clone();
        let mut inner = self.inner.clone();

        let caller = request
            .extensions()
            .get::<CallerContext>()
            .cloned()
            .unwrap_or_default();
        let authz_request = authorizer.build_request(
            request.method().as_str(),
            request.uri().path(),
            caller.roles.as_deref(),
            caller.tenant_id.as_deref(),
        );

        let span = info_span!(
            "authorize",
            request_id = %request_id(request.headers()),
            method = %authz_request.method,
            path = %authz_request.path,
        );

        Box::pin(
            async move {
                let reason = match authorizer.authorize(&authz_request).await {
                    Decision::Allow(reason) => reason,
                    Decision::Deny(_) => return Ok(StatusCode::FORBIDDEN.into_response()),
                };

                let residual_path = match reason {
                    AllowReason::RoleGranted { .. } => authorizer
                        .scoper()
                        .scope(&authz_request.path, authz_request.tenant_id.as_ref())
                        .ok()
                        .map(|scoped| scoped.residual_path().to_string()),
                    _ => None,
                };

                request.extensions_mut().insert(AuthorizedRequest {
                    tenant_id: authz_request.tenant_id.clone(),
                    residual_path,
                    reason,
                });

                inner.call(request).await
            }
            .instrument(span),
        )
    }
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Trusted identity headers
// ═══════════════════════════════════════════════════════════════════════════════

/// Header names used when a trusted gateway forwards caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHeaders {
    pub roles_header: String,
    pub tenant_header: String,
}

impl Default for IdentityHeaders {
    fn default() -> Self {
        Self {
            roles_header: "x-warden-roles".to_string(),
            tenant_header: "x-warden-tenant".to_string(),
        }
    }
}

/// Populate [`CallerContext`] from identity headers when none is present.
///
/// Only mount this behind a gateway that strips these headers from client
/// traffic; otherwise callers can claim any role.
///
/// ```rust,ignore
/// let app = router
///     .layer(AuthorizeLayer::new(authorizer))
///     .layer(axum::middleware::from_fn_with_state(
///         IdentityHeaders::default(),
///         identity_from_headers,
///     ));
/// ```
pub async fn identity_from_headers(
    State(names): State<IdentityHeaders>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<CallerContext>().is_none() {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let caller = CallerContext {
            roles: header(&names.roles_header),
            tenant_id: header(&names.tenant_header),
        };
        request.extensions_mut().insert(caller);
    }

    next.run(request).await
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
