//! HTTP client for talking to a running Warden server.

use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;

use warden_core::authz::IdentityHeaders;

/// Outcome of sending one request through the server's authorization gate.
#[derive(Debug, Serialize)]
pub struct ProbeResult {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub allowed: bool,
    /// JSON echoed by the server for allowed requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// HTTP client for the Warden server.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client pointing at the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform a raw GET request and return the full JSON value.
    pub async fn get_raw(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// Send `method path` with caller identity in trusted headers.
    ///
    /// Only a 403 counts as a denial; any other non-success status is an error.
    pub async fn probe(
        &self,
        method: &str,
        path: &str,
        roles: Option<&str>,
        tenant: Option<&str>,
        headers: &IdentityHeaders,
    ) -> Result<ProbeResult> {
        let method_value = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {}", method))?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.request(method_value.clone(), &url);
        if let Some(roles) = roles {
            request = request.header(headers.roles_header.as_str(), roles);
        }
        if let Some(tenant) = tenant {
            request = request.header(headers.tenant_header.as_str(), tenant);
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("{} {} failed", method_value, url))?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            return Ok(ProbeResult {
                method: method_value.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                allowed: false,
                body: None,
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        let body = resp.json::<serde_json::Value>().await.ok();
        Ok(ProbeResult {
            method: method_value.to_string(),
            path: path.to_string(),
            status: status.as_u16(),
            allowed: true,
            body,
        })
    }
}
