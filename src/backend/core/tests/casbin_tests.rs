//! Casbin engine tests against real model and policy files.

use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

use warden_core::authz::{
    AllowReason, Authorizer, CasbinPolicyEngine, Decision, PolicyEngine, DEFAULT_MODEL,
};

fn write_file(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const POLICY: &str = "\
p, viewer, /users, GET
p, viewer, /users/:id, GET
p, editor, /users/:id, *
g, lead, editor
";

#[tokio::test]
async fn test_loads_model_and_policy_files() {
    let model = write_file(DEFAULT_MODEL, ".conf");
    let policy = write_file(POLICY, ".csv");

    let engine = CasbinPolicyEngine::from_files(model.path(), policy.path())
        .await
        .unwrap();

    assert_eq!(engine.rule_count(), 3);
    assert!(engine.enforce("viewer", "/users/42", "GET").await.unwrap());
    assert!(!engine.enforce("viewer", "/users/42", "DELETE").await.unwrap());
    assert!(engine.enforce("editor", "/users/42", "DELETE").await.unwrap());
}

#[tokio::test]
async fn test_role_inheritance_via_grouping() {
    let model = write_file(DEFAULT_MODEL, ".conf");
    let policy = write_file(POLICY, ".csv");
    let engine = CasbinPolicyEngine::from_files(model.path(), policy.path())
        .await
        .unwrap();

    assert!(engine.enforce("lead", "/users/42", "PATCH").await.unwrap());
    assert!(!engine.enforce("lead", "/users", "GET").await.unwrap());
}

#[tokio::test]
async fn test_reload_picks_up_new_rules() {
    let model = write_file(DEFAULT_MODEL, ".conf");
    let mut policy = write_file("p, viewer, /users, GET\n", ".csv");
    let engine = CasbinPolicyEngine::from_files(model.path(), policy.path())
        .await
        .unwrap();

    assert!(!engine.enforce("viewer", "/projects", "GET").await.unwrap());

    policy.write_all(b"p, viewer, /projects, GET\n").unwrap();
    policy.flush().unwrap();
    engine.reload().await.unwrap();

    assert_eq!(engine.rule_count(), 2);
    assert!(engine.enforce("viewer", "/projects", "GET").await.unwrap());
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_rules() {
    let model = write_file(DEFAULT_MODEL, ".conf");
    let policy = write_file("p, viewer, /users, GET\n", ".csv");
    let engine = CasbinPolicyEngine::from_files(model.path(), policy.path())
        .await
        .unwrap();

    let policy_path = policy.path().to_path_buf();
    drop(policy);
    assert!(!policy_path.exists());

    assert!(engine.reload().await.is_err());
    assert!(engine.enforce("viewer", "/users", "GET").await.unwrap());
}

#[tokio::test]
async fn test_authorizer_over_casbin() {
    let model = write_file(DEFAULT_MODEL, ".conf");
    let policy = write_file(POLICY, ".csv");
    let engine = CasbinPolicyEngine::from_files(model.path(), policy.path())
        .await
        .unwrap();
    let authz = Authorizer::new(Arc::new(engine));

    let request = authz.build_request(
        "GET",
        "/v1/organisations/7/users/42",
        Some("viewer"),
        Some("7"),
    );
    assert_eq!(
        authz.authorize(&request).await,
        Decision::Allow(AllowReason::RoleGranted {
            role: "viewer".into()
        })
    );

    let other_tenant = authz.build_request(
        "GET",
        "/v1/organisations/8/users/42",
        Some("viewer"),
        Some("7"),
    );
    assert!(authz.authorize(&other_tenant).await.is_denied());
}
