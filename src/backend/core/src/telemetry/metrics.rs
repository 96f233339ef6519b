//! Prometheus metrics for authorization decisions.
//!
//! - `warden_decisions_total{outcome, reason}`: every decision
//! - `warden_enforcement_failures_total{role}`: policy engine incidents only
//! - `warden_decision_duration_seconds{outcome}`: time spent deciding
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_core::telemetry::metrics::DecisionMetrics;
//!
//! DecisionMetrics::record(&decision, started.elapsed());
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::authz::{Decision, Denial};
use crate::error::Result;

pub const DECISIONS_TOTAL: &str = "warden_decisions_total";
pub const ENFORCEMENT_FAILURES_TOTAL: &str = "warden_enforcement_failures_total";
pub const DECISION_DURATION_SECONDS: &str = "warden_decision_duration_seconds";

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Whether the Prometheus recorder is installed and `/metrics` served
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    /// Histogram buckets for decision durations (in seconds)
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,

    /// Labels added to every metric
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            duration_buckets: default_duration_buckets(),
            global_labels: HashMap::new(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

// Decisions are sub-millisecond unless the engine is remote.
fn default_duration_buckets() -> Vec<f64> {
    vec![
        0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5,
    ]
}

/// Handle onto the installed recorder, if any.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prometheus_handle", &self.prometheus_handle.is_some())
            .finish()
    }
}

impl MetricsRegistry {
    /// A registry with no recorder; `render` returns `None`.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self {
            prometheus_handle: Some(handle),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> Option<String> {
        self.prometheus_handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Install the global Prometheus recorder.
///
/// # Errors
///
/// Fails on invalid buckets or if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig, service_name: &str) -> Result<MetricsRegistry> {
    if !config.enabled {
        return Ok(MetricsRegistry::disabled());
    }

    let mut builder = PrometheusBuilder::new();
    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }
    builder = builder.set_buckets(&config.duration_buckets)?;

    let handle = builder.install_recorder()?;
    register_metric_descriptions();

    tracing::info!(service_name = %service_name, "Metrics initialized");

    Ok(MetricsRegistry::from_handle(handle))
}

fn register_metric_descriptions() {
    describe_counter!(DECISIONS_TOTAL, "Authorization decisions by outcome and reason");
    describe_counter!(
        ENFORCEMENT_FAILURES_TOTAL,
        "Policy engine failures that forced a denial"
    );
    describe_histogram!(
        DECISION_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time spent deciding a request"
    );
    describe_counter!("warden_errors_total", "Process-level errors by code");
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision Metrics
// ═══════════════════════════════════════════════════════════════════════════════

/// Records one decision. A no-op when no recorder is installed.
pub struct DecisionMetrics;

impl DecisionMetrics {
    pub fn record(decision: &Decision, elapsed: Duration) {
        let outcome = decision.outcome();

        counter!(
            DECISIONS_TOTAL,
            "outcome" => outcome,
            "reason" => decision.reason(),
        )
        .increment(1);

        histogram!(DECISION_DURATION_SECONDS, "outcome" => outcome).record(elapsed.as_secs_f64());

        if let Some(Denial::EnforcementFailure { role, .. }) = decision.denial() {
            counter!(ENFORCEMENT_FAILURES_TOTAL, "role" => role.to_string()).increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{AllowReason, EnforcementError, Role};

    fn render_with(f: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, f);
        handle.render()
    }

    #[test]
    fn test_allow_recorded_with_reason() {
        let output = render_with(|| {
            DecisionMetrics::record(
                &Decision::Allow(AllowReason::PrivilegedBypass),
                Duration::from_micros(40),
            );
        });

        assert!(output.contains(r#"warden_decisions_total{outcome="allow",reason="privileged_bypass"} 1"#));
        assert!(!output.contains(ENFORCEMENT_FAILURES_TOTAL));
    }

    #[test]
    fn test_enforcement_failure_counted_as_incident() {
        let output = render_with(|| {
            DecisionMetrics::record(
                &Decision::Deny(Denial::EnforcementFailure {
                    role: Role::new("viewer"),
                    source: EnforcementError::Timeout { timeout_ms: 250 },
                }),
                Duration::from_millis(250),
            );
        });

        assert!(output.contains(r#"warden_decisions_total{outcome="deny",reason="enforcement_failure"} 1"#));
        assert!(output.contains(r#"warden_enforcement_failures_total{role="viewer"} 1"#));
    }

    #[test]
    fn test_disabled_registry_renders_nothing() {
        let registry = MetricsRegistry::disabled();
        assert!(!registry.is_enabled());
        assert!(registry.render().is_none());
    }
}
