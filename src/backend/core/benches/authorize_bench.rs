//! Benchmarks for the authorization decision procedure.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use warden_core::authz::{
    Authorizer, CasbinPolicyEngine, MemoryPolicyEngine, PolicyRule, RoleExtractor, TenantId,
    TenantScoper,
};

fn rules(count: usize) -> Vec<PolicyRule> {
    (0..count)
        .map(|i| PolicyRule::new(format!("role-{}", i % 16), format!("/resource-{}/:id", i), "GET"))
        .chain([PolicyRule::new("viewer", "/users/:id", "GET")])
        .collect()
}

fn bench_role_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("role_parsing");
    let extractor = RoleExtractor::default();
    group.bench_function("single", |b| { b.iter(|| black_box(extractor.parse("viewer"))); });
    group.bench_function("five_with_whitespace", |b| { b.iter(|| black_box(extractor.parse(" viewer, editor ,billing,, auditor,viewer "))); });
    group.finish();
}

fn bench_tenant_scoping(c: &mut Criterion) {
    let mut group = c.benchmark_group("tenant_scoping");
    let scoper = TenantScoper::default();
    let tenant = TenantId::new("7");
    group.bench_function("match", |b| { b.iter(|| black_box(scoper.scope("/v1/organisations/7/users/42/keys", Some(&tenant)))); });
    group.bench_function("mismatch", |b| { b.iter(|| black_box(scoper.scope("/v1/organisations/8/users/42/keys", Some(&tenant)))); });
    group.bench_function("not_scoped", |b| { b.iter(|| black_box(scoper.scope("/v1/health", Some(&tenant)))); });
    group.finish();
}

fn bench_authorize_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("authorize_memory");
    let rt = tokio::runtime::Runtime::new().unwrap();
    for count in [10, 100, 1_000] {
        let authz = Authorizer::new(Arc::new(MemoryPolicyEngine::with_rules(rules(count))));
        let request = authz.build_request("GET", "/v1/organisations/7/users/42", Some("guest,viewer"), Some("7"));
        group.bench_with_input(BenchmarkId::from_parameter(count), &request, |b, req| {
            b.to_async(&rt).iter(|| async { black_box(authz.authorize(req).await) });
        });
    }
    let authz = Authorizer::new(Arc::new(MemoryPolicyEngine::new()));
    let admin = authz.build_request("DELETE", "/v1/organisations/7/users/42", Some("admin"), None);
    group.bench_function("privileged_bypass", |b| { b.to_async(&rt).iter(|| async { black_box(authz.authorize(&admin).await) }); });
    group.finish();
}

fn bench_authorize_casbin(c: &mut Criterion) {
    let mut group = c.benchmark_group("authorize_casbin");
    let rt = tokio::runtime::Runtime::new().unwrap();
    for count in [10, 100] {
        let engine = rt.block_on(CasbinPolicyEngine::with_rules(rules(count))).unwrap();
        let authz = Authorizer::new(Arc::new(engine));
        let request = authz.build_request("GET", "/v1/organisations/7/users/42", Some("guest,viewer"), Some("7"));
        group.bench_with_input(BenchmarkId::from_parameter(count), &request, |b, req| {
            b.to_async(&rt).iter(|| async { black_box(authz.authorize(req).await) });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_role_parsing, bench_tenant_scoping, bench_authorize_memory, bench_authorize_casbin);
criterion_main!(benches);
