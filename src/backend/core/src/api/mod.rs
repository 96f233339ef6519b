//! HTTP surface of the Warden server.
//!
//! - `GET /health` and `GET /metrics` are served without authorization
//! - every other request passes through [`AuthorizeLayer`]; allowed requests
//!   reach a fallback that echoes the [`AuthorizedRequest`](crate::authz::AuthorizedRequest),
//!   standing in for the downstream application

mod handlers;

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::authz::{
    identity_from_headers, AuthorizeLayer, Authorizer, CasbinPolicyEngine, IdentityHeaders,
    MemoryPolicyEngine, PolicyEngine,
};
use crate::config::{Config, PolicyBackend, PolicyConfig};
use crate::error::{Result, WardenError};
use crate::telemetry::MetricsRegistry;

/// Application state shared across handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub authorizer: Arc<Authorizer>,
    pub metrics: MetricsRegistry,
    /// Set when caller identity is read from trusted gateway headers
    pub identity_headers: Option<IdentityHeaders>,
}

impl AppState {
    pub fn new(authorizer: Arc<Authorizer>, metrics: MetricsRegistry) -> Self {
        Self {
            authorizer,
            metrics,
            identity_headers: None,
        }
    }

    pub fn with_identity_headers(mut self, headers: IdentityHeaders) -> Self {
        self.identity_headers = Some(headers);
        self
    }

    /// Build the configured policy engine and authorizer.
    pub async fn from_config(config: &Config, metrics: MetricsRegistry) -> Result<Self> {
        let engine = build_engine(&config.policy).await?;
        let authorizer = Arc::new(Authorizer::from_config(engine, &config.authz));

        let mut state = Self::new(authorizer, metrics);
        if config.authz.trust_identity_headers {
            state = state.with_identity_headers(IdentityHeaders {
                roles_header: config.authz.roles_header.clone(),
                tenant_header: config.authz.tenant_header.clone(),
            });
        }
        Ok(state)
    }
}

/// Construct the policy engine selected by `[policy]`.
pub async fn build_engine(config: &PolicyConfig) -> Result<Arc<dyn PolicyEngine>> {
    match config.backend {
        PolicyBackend::Memory => {
            let engine = MemoryPolicyEngine::with_rules(config.rules.iter().cloned());
            info!(rules = engine.len(), "Using in-memory policy engine");
            Ok(Arc::new(engine))
        }
        PolicyBackend::Casbin => {
            let (model, policy) = match (&config.model_path, &config.policy_path) {
                (Some(model), Some(policy)) => (model, policy),
                _ => {
                    return Err(WardenError::invalid_config(
                        "policy.model_path and policy.policy_path are required for the casbin backend",
                    ))
                }
            };
            let engine = CasbinPolicyEngine::from_files(model, policy).await?;
            info!(
                model = %model.display(),
                policy = %policy.display(),
                rules = engine.rule_count(),
                "Using casbin policy engine"
            );
            Ok(Arc::new(engine))
        }
    }
}

/// Build the router.
///
/// Layer order, outermost first: trace, identity headers (if trusted),
/// authorization, fallback handler.
pub fn build_router(state: AppState) -> Router {
    let mut protected = Router::new()
        .fallback(handlers::echo_authorized)
        .layer(AuthorizeLayer::new(state.authorizer.clone()));

    if let Some(headers) = state.identity_headers.clone() {
        protected = protected.layer(axum_middleware::from_fn_with_state(
            headers,
            identity_from_headers,
        ));
    }

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
        .fallback_service(protected)
        .layer(TraceLayer::new_for_http())
}
