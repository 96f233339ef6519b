//! Decision procedure tests.
//!
//! Tests cover:
//! - Privileged bypass
//! - Tenant scoping and mismatch handling
//! - Missing and malformed role attributes
//! - OR combination across roles
//! - Engine failures and timeouts
//! - Idempotence and residual path reconstruction

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use warden_core::authz::{
    AllowReason, Authorizer, Decision, Denial, EnforcementError, MemoryPolicyEngine, PolicyEngine,
    PolicyRule, ScopeError, TenantId, TenantScoper,
};

// ============================================================================
// Test Doubles
// ============================================================================

/// Fails every call and counts how often it was asked.
#[derive(Default)]
struct FailingEngine {
    calls: AtomicUsize,
}

#[async_trait]
impl PolicyEngine for FailingEngine {
    async fn enforce(&self, _: &str, _: &str, _: &str) -> Result<bool, EnforcementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EnforcementError::Unavailable("policy store offline".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Never answers in time.
struct SlowEngine;

#[async_trait]
impl PolicyEngine for SlowEngine {
    async fn enforce(&self, _: &str, _: &str, _: &str) -> Result<bool, EnforcementError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Records every `(subject, object, action)` and grants nothing.
#[derive(Default)]
struct RecordingEngine {
    calls: Mutex<Vec<(String, String, String)>>,
}

impl RecordingEngine {
    fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PolicyEngine for RecordingEngine {
    async fn enforce(&self, s: &str, o: &str, a: &str) -> Result<bool, EnforcementError> {
        self.calls
            .lock()
            .unwrap()
            .push((s.to_string(), o.to_string(), a.to_string()));
        Ok(false)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn viewer_policy() -> Authorizer {
    Authorizer::new(Arc::new(MemoryPolicyEngine::with_rules([
        PolicyRule::new("viewer", "/users", "GET"),
        PolicyRule::new("editor", "/users", "POST"),
    ])))
}

async fn decide(
    authz: &Authorizer,
    method: &str,
    path: &str,
    roles: Option<&str>,
    tenant: Option<&str>,
) -> Decision {
    let request = authz.build_request(method, path, roles, tenant);
    authz.authorize(&request).await
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_admin_bypasses_tenant_mismatch() {
    let authz = viewer_policy();
    let decision = decide(&authz, "GET", "/v1/organisations/7/users", Some("admin"), Some("9")).await;

    assert_eq!(decision, Decision::Allow(AllowReason::PrivilegedBypass));
}

#[tokio::test]
async fn test_viewer_granted_on_own_tenant() {
    let authz = viewer_policy();
    let decision = decide(&authz, "GET", "/v1/organisations/7/users", Some("viewer"), Some("7")).await;

    assert_eq!(
        decision,
        Decision::Allow(AllowReason::RoleGranted {
            role: "viewer".into()
        })
    );
}

#[tokio::test]
async fn test_tenant_mismatch_denied() {
    let authz = viewer_policy();
    let decision = decide(&authz, "GET", "/v1/organisations/7/users", Some("viewer"), Some("9")).await;

    assert_eq!(
        decision,
        Decision::Deny(Denial::TenantScopeMismatch(ScopeError::TenantMismatch {
            claimed: "9".into(),
            found: "7".into(),
        }))
    );
}

#[tokio::test]
async fn test_empty_or_absent_roles_denied() {
    let authz = viewer_policy();

    for roles in [None, Some(""), Some(" , ,")] {
        let decision = decide(&authz, "GET", "/v1/organisations/7/users", roles, Some("7")).await;
        assert_eq!(decision, Decision::Deny(Denial::NoRolesPresent), "roles = {:?}", roles);
    }
}

#[tokio::test]
async fn test_any_granting_role_allows() {
    let authz = viewer_policy();
    let decision = decide(
        &authz,
        "POST",
        "/v1/organisations/7/users",
        Some("viewer,editor"),
        Some("7"),
    )
    .await;

    assert_eq!(
        decision,
        Decision::Allow(AllowReason::RoleGranted {
            role: "editor".into()
        })
    );
}

#[tokio::test]
async fn test_engine_error_denies_with_enforcement_failure() {
    let engine = Arc::new(FailingEngine::default());
    let authz = Authorizer::new(engine.clone());

    let decision = decide(
        &authz,
        "GET",
        "/v1/organisations/7/users",
        Some("viewer,editor"),
        Some("7"),
    )
    .await;

    match decision {
        Decision::Deny(Denial::EnforcementFailure { role, source }) => {
            assert_eq!(role.as_str(), "viewer");
            assert!(matches!(source, EnforcementError::Unavailable(_)));
        }
        other => panic!("expected enforcement failure, got {:?}", other),
    }
    // The loop stops at the first failure.
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_admin_allowed_everywhere() {
    let authz = Authorizer::new(Arc::new(FailingEngine::default()));

    for (method, path, tenant) in [
        ("DELETE", "/v1/organisations/1/users/2", Some("3")),
        ("GET", "/v1/health", None),
        ("PATCH", "/", Some("0")),
        ("GET", "", None),
    ] {
        let decision = decide(&authz, method, path, Some("viewer,admin"), tenant).await;
        assert!(decision.is_allowed(), "{} {} should bypass", method, path);
    }
}

#[tokio::test]
async fn test_non_tenant_paths_denied_without_privilege() {
    let authz = Authorizer::new(Arc::new(MemoryPolicyEngine::with_rules([PolicyRule::new(
        "viewer", "*", "*",
    )])));

    for path in ["/v1/health", "/v2/organisations/7/users", "v1/organisations/7/users", "/"] {
        let decision = decide(&authz, "GET", path, Some("viewer"), Some("7")).await;
        assert!(
            matches!(
                decision,
                Decision::Deny(Denial::TenantScopeMismatch(ScopeError::NotTenantScoped { .. }))
            ),
            "{} should not be tenant-scoped: {:?}",
            path,
            decision
        );
    }
}

#[tokio::test]
async fn test_unset_tenant_claim_denied() {
    let authz = viewer_policy();

    for tenant in [None, Some(""), Some("0")] {
        let decision = decide(&authz, "GET", "/v1/organisations/0/users", Some("viewer"), tenant).await;
        assert_eq!(
            decision,
            Decision::Deny(Denial::TenantScopeMismatch(ScopeError::MissingTenant))
        );
    }
}

#[tokio::test]
async fn test_tenant_compared_without_normalisation() {
    let authz = viewer_policy();

    for (path, tenant) in [
        ("/v1/organisations/07/users", "7"),
        ("/v1/organisations/Acme/users", "acme"),
        ("/v1/organisations/7%20/users", "7"),
    ] {
        let decision = decide(&authz, "GET", path, Some("viewer"), Some(tenant)).await;
        assert!(decision.is_denied(), "{} with tenant {}", path, tenant);
    }
}

#[tokio::test]
async fn test_decisions_are_idempotent() {
    let authz = viewer_policy();
    let request = authz.build_request("GET", "/v1/organisations/7/users", Some("viewer"), Some("7"));

    let first = authz.authorize(&request).await;
    for _ in 0..10 {
        assert_eq!(authz.authorize(&request).await, first);
    }
}

#[tokio::test]
async fn test_engine_receives_residual_path_and_method() {
    let engine = Arc::new(RecordingEngine::default());
    let authz = Authorizer::new(engine.clone());

    let decision = decide(
        &authz,
        "PUT",
        "/v1/organisations/7/users/42/keys",
        Some("viewer, editor, viewer"),
        Some("7"),
    )
    .await;

    assert_eq!(
        decision,
        Decision::Deny(Denial::NoRoleGranted {
            resource: "/users/42/keys".into(),
            action: "PUT".into(),
        })
    );
    assert_eq!(
        engine.calls(),
        vec![
            ("viewer".into(), "/users/42/keys".into(), "PUT".into()),
            ("editor".into(), "/users/42/keys".into(), "PUT".into()),
        ]
    );
}

#[tokio::test]
async fn test_tenant_root_maps_to_slash() {
    let engine = Arc::new(RecordingEngine::default());
    let authz = Authorizer::new(engine.clone());

    decide(&authz, "GET", "/v1/organisations/7/", Some("viewer"), Some("7")).await;
    assert_eq!(engine.calls()[0].1, "/");
}

#[test]
fn test_residual_reconstructs_original_path() {
    let scoper = TenantScoper::default();
    let tenant = TenantId::new("7");

    for path in [
        "/v1/organisations/7/users",
        "/v1/organisations/7/users/42/keys",
        "/v1/organisations/7/a//b/",
    ] {
        let scoped = scoper.scope(path, Some(&tenant)).unwrap();
        assert_eq!(scoped.tenant_segment(), "7");
        assert_eq!(
            format!("{}{}", scoper.tenant_root(&tenant), scoped.residual_path()),
            path
        );
    }
}

// ============================================================================
// Timeouts
// ============================================================================

#[tokio::test]
async fn test_slow_engine_times_out_as_enforcement_failure() {
    let authz = Authorizer::new(Arc::new(SlowEngine))
        .with_enforcement_timeout(Duration::from_millis(20));

    let decision = decide(&authz, "GET", "/v1/organisations/7/users", Some("viewer"), Some("7")).await;

    match decision {
        Decision::Deny(Denial::EnforcementFailure { source, .. }) => {
            assert_eq!(source, EnforcementError::Timeout { timeout_ms: 20 });
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_decisions_share_authorizer() {
    let authz = Arc::new(viewer_policy());

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let authz = authz.clone();
            tokio::spawn(async move {
                let tenant = if i % 2 == 0 { "7" } else { "8" };
                let request = authz.build_request(
                    "GET",
                    "/v1/organisations/7/users",
                    Some("viewer"),
                    Some(tenant),
                );
                (i, authz.authorize(&request).await)
            })
        })
        .collect();

    for handle in handles {
        let (i, decision) = handle.await.unwrap();
        assert_eq!(decision.is_allowed(), i % 2 == 0);
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Run `f` with a thread-local Prometheus recorder and return the rendered output.
fn render_metrics(f: impl FnOnce()) -> String {
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::with_local_recorder(&recorder, f);
    handle.render()
}

#[test]
fn test_authorize_records_enforcement_failure_metrics() {
    let authz = Authorizer::new(Arc::new(FailingEngine::default()));

    let output = render_metrics(|| {
        let decision = tokio_test::block_on(decide(
            &authz,
            "GET",
            "/v1/organisations/7/users",
            Some("viewer,editor"),
            Some("7"),
        ));
        assert!(decision.is_denied());
    });

    assert!(output.contains(r#"warden_enforcement_failures_total{role="viewer"} 1"#));
    assert!(output.contains(
        r#"warden_decisions_total{outcome="deny",reason="enforcement_failure"} 1"#
    ));
    assert!(!output.contains(r#"role="editor""#));
}

#[test]
fn test_authorize_records_allow_metrics() {
    let authz = viewer_policy();

    let output = render_metrics(|| {
        for _ in 0..2 {
            let decision = tokio_test::block_on(decide(
                &authz,
                "GET",
                "/v1/organisations/7/users",
                Some("viewer"),
                Some("7"),
            ));
            assert!(decision.is_allowed());
        }
    });

    assert!(output.contains(r#"warden_decisions_total{outcome="allow",reason="role_granted"} 2"#));
    assert!(output.contains("warden_decision_duration_seconds"));
    assert!(!output.contains("warden_enforcement_failures_total"));
}
