//! Probe a running server's authorization gate.
//!
//! The server must trust identity headers (`authz.trust_identity_headers`).

use anyhow::Result;
use clap::Args;

use warden_core::authz::IdentityHeaders;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ProbeArgs {
    /// Request path, e.g. /v1/organisations/7/users
    #[arg(short, long)]
    path: String,

    /// HTTP method
    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Caller roles sent in the roles header
    #[arg(short, long)]
    roles: Option<String>,

    /// Tenant sent in the tenant header
    #[arg(short, long)]
    tenant: Option<String>,

    /// Header carrying roles
    #[arg(long, default_value = "x-warden-roles")]
    roles_header: String,

    /// Header carrying the tenant id
    #[arg(long, default_value = "x-warden-tenant")]
    tenant_header: String,
}

/// Returns whether the server let the request through.
pub async fn execute(args: ProbeArgs, client: &ApiClient, format: OutputFormat) -> Result<bool> {
    let headers = IdentityHeaders {
        roles_header: args.roles_header,
        tenant_header: args.tenant_header,
    };

    let result = client
        .probe(
            &args.method,
            &args.path,
            args.roles.as_deref(),
            args.tenant.as_deref(),
            &headers,
        )
        .await?;

    match format {
        OutputFormat::Table => {
            output::print_header("Probe");
            output::print_detail("Server", client.base_url());
            output::print_detail("Request", &format!("{} {}", result.method, result.path));
            output::print_detail("Status", &result.status.to_string());
            if let Some(reason) = result
                .body
                .as_ref()
                .and_then(|b| b.pointer("/data/authorization/reason/kind"))
                .and_then(|v| v.as_str())
            {
                output::print_detail("Reason", reason);
            }
            println!();
            if result.allowed {
                output::print_success("Request allowed");
            } else {
                output::print_denied("Request forbidden");
            }
        }
        _ => output::print_item(&result, format)?,
    }

    Ok(result.allowed)
}
