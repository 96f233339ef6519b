//! Offline decision check.
//!
//! Runs the full decision procedure locally against a Casbin model/policy
//! pair (or inline `--rule`s) without a running server.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use warden_core::authz::{
    Authorizer, CasbinPolicyEngine, Decision, MemoryPolicyEngine, PolicyEngine, PolicyRule,
    RoleExtractor, TenantScoper, DEFAULT_ROLE_DELIMITER, PRIVILEGED_ROLE,
};

use super::config::{load_value, KEY_MODEL, KEY_POLICY};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// Request path, e.g. /v1/organisations/7/users
    #[arg(short, long)]
    path: String,

    /// HTTP method
    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Caller roles, delimiter-separated
    #[arg(short, long)]
    roles: Option<String>,

    /// Tenant the caller claims
    #[arg(short, long)]
    tenant: Option<String>,

    /// Casbin model file (defaults to the `model` config key)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Casbin policy file (defaults to the `policy` config key)
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Inline rule "subject,object,action"; repeatable. Replaces model/policy files.
    #[arg(long = "rule")]
    rules: Vec<String>,

    /// Role that bypasses all checks
    #[arg(long, default_value = PRIVILEGED_ROLE)]
    privileged_role: String,

    /// Separator between role names
    #[arg(long, default_value = DEFAULT_ROLE_DELIMITER)]
    delimiter: String,

    /// Path segments before the tenant id, slash-separated
    #[arg(long, default_value = "v1/organisations")]
    tenant_prefix: String,

    /// Non-tenant path prefix enforced on the raw path; repeatable
    #[arg(long = "public-prefix")]
    public_prefixes: Vec<String>,

    /// Per-role policy engine timeout in milliseconds
    #[arg(long, default_value = "250")]
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    allowed: bool,
    outcome: &'static str,
    reason: &'static str,
    detail: String,
    method: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    residual_path: Option<String>,
    engine: &'static str,
}

/// Parse `"subject,object,action"`.
pub fn parse_rule(raw: &str) -> Result<PolicyRule> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [subject, object, action]
            if !subject.is_empty() && !object.is_empty() && !action.is_empty() =>
        {
            Ok(PolicyRule::new(*subject, *object, *action))
        }
        _ => anyhow::bail!("Invalid rule '{}': expected \"subject,object,action\"", raw),
    }
}

async fn build_engine(args: &CheckArgs) -> Result<Arc<dyn PolicyEngine>> {
    if !args.rules.is_empty() {
        let rules = args
            .rules
            .iter()
            .map(|raw| parse_rule(raw))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Arc::new(MemoryPolicyEngine::with_rules(rules)));
    }

    let model = args
        .model
        .clone()
        .or_else(|| load_value(KEY_MODEL).map(PathBuf::from))
        .context("No policy given: pass --rule, or --model/--policy (or set them with `warden config set`)")?;
    let policy = args
        .policy
        .clone()
        .or_else(|| load_value(KEY_POLICY).map(PathBuf::from))
        .context("No policy file given: pass --policy or run `warden config set policy <file>`")?;

    let engine = CasbinPolicyEngine::from_files(&model, &policy)
        .await
        .with_context(|| {
            format!(
                "Failed to load casbin model {} with policy {}",
                model.display(),
                policy.display()
            )
        })?;
    Ok(Arc::new(engine))
}

/// Evaluate one request. Returns whether it was allowed.
pub async fn execute(args: CheckArgs, format: OutputFormat) -> Result<bool> {
    let engine = build_engine(&args).await?;

    let authorizer = Authorizer::new(engine)
        .with_role_extractor(RoleExtractor::new(
            args.delimiter.as_str(),
            args.privileged_role.as_str(),
        ))
        .with_scoper(TenantScoper::new(
            args.tenant_prefix.split('/').filter(|s| !s.is_empty()),
        ))
        .with_public_prefixes(args.public_prefixes.iter().cloned())
        .with_enforcement_timeout(Duration::from_millis(args.timeout_ms));

    let request = authorizer.build_request(
        &args.method.to_ascii_uppercase(),
        &args.path,
        args.roles.as_deref(),
        args.tenant.as_deref(),
    );
    let decision = authorizer.authorize(&request).await;

    let residual_path = authorizer
        .scoper()
        .scope(&request.path, request.tenant_id.as_ref())
        .ok()
        .map(|scoped| scoped.residual_path().to_string());

    let detail = match &decision {
        Decision::Allow(_) => decision.to_string(),
        Decision::Deny(denial) => denial.to_string(),
    };

    let report = CheckReport {
        allowed: decision.is_allowed(),
        outcome: decision.outcome(),
        reason: decision.reason(),
        detail,
        method: request.method.clone(),
        path: request.path.clone(),
        residual_path,
        engine: authorizer.engine_name(),
    };

    match format {
        OutputFormat::Table => {
            output::print_header("Decision");
            output::print_detail("Request", &format!("{} {}", report.method, report.path));
            if let Some(residual) = &report.residual_path {
                output::print_detail("Policy object", residual);
            }
            output::print_detail("Engine", report.engine);
            output::print_detail("Reason", report.reason);
            println!();

            if report.allowed {
                output::print_success(&report.detail);
            } else {
                output::print_denied(&report.detail);
            }
        }
        _ => output::print_item(&report, format)?,
    }

    Ok(report.allowed)
}
