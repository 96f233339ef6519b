//! Show how a path is scoped to a tenant.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use warden_core::authz::{TenantId, TenantScoper};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ScopeArgs {
    /// Request path, e.g. /v1/organisations/7/users
    #[arg(short, long)]
    path: String,

    /// Tenant the caller claims
    #[arg(short, long)]
    tenant: Option<String>,

    /// Path segments before the tenant id, slash-separated
    #[arg(long, default_value = "v1/organisations")]
    tenant_prefix: String,
}

#[derive(Debug, Serialize)]
struct ScopeReport {
    path: String,
    tenant_scoped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    residual_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Returns whether the path scoped cleanly.
pub async fn execute(args: ScopeArgs, format: OutputFormat) -> Result<bool> {
    let scoper = TenantScoper::new(args.tenant_prefix.split('/').filter(|s| !s.is_empty()));
    let claimed = args.tenant.as_deref().map(TenantId::from);

    let report = match scoper.scope(&args.path, claimed.as_ref()) {
        Ok(scoped) => ScopeReport {
            path: args.path.clone(),
            tenant_scoped: true,
            tenant: Some(scoped.tenant_segment().to_string()),
            residual_path: Some(scoped.residual_path().to_string()),
            error: None,
        },
        Err(e) => ScopeReport {
            path: args.path.clone(),
            tenant_scoped: scoper.is_tenant_scoped(&args.path),
            tenant: args.tenant.clone(),
            residual_path: None,
            error: Some(e.to_string()),
        },
    };

    match format {
        OutputFormat::Table => {
            output::print_header("Tenant Scope");
            output::print_detail("Path", &report.path);
            output::print_detail("Tenant-shaped", &report.tenant_scoped.to_string());
            if let Some(tenant) = &report.tenant {
                output::print_detail("Tenant", tenant);
            }
            println!();
            match (&report.residual_path, &report.error) {
                (Some(residual), _) => output::print_success(&format!("Policy object: {}", residual)),
                (_, Some(error)) => output::print_denied(error),
                _ => {}
            }
        }
        _ => output::print_item(&report, format)?,
    }

    Ok(report.error.is_none())
}
