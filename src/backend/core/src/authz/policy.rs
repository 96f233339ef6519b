//! Policy engines answer a single question:
//! "May role R perform action A on resource O?"
//!
//! The decision procedure only depends on the [`PolicyEngine`] trait. Two
//! implementations ship with the crate: [`MemoryPolicyEngine`] (below) and
//! [`CasbinPolicyEngine`](super::casbin_engine::CasbinPolicyEngine).

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// A policy engine failed to produce an answer.
///
/// This is never "not allowed": a refusal is `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnforcementError {
    #[error("policy engine error: {0}")]
    Engine(String),

    #[error("policy engine did not answer within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("policy engine unavailable: {0}")]
    Unavailable(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Engine Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Capability consumed by the [`Authorizer`](super::authorizer::Authorizer).
///
/// Implementations must tolerate concurrent `enforce` calls from many
/// in-flight requests.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Check `(subject, object, action)`, e.g. `("viewer", "/users", "GET")`.
    async fn enforce(
        &self,
        subject: &str,
        object: &str,
        action: &str,
    ) -> Result<bool, EnforcementError>;

    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: PolicyEngine + ?Sized> PolicyEngine for Arc<T> {
    async fn enforce(
        &self,
        subject: &str,
        object: &str,
        action: &str,
    ) -> Result<bool, EnforcementError> {
        (**self).enforce(subject, object, action).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Policy Rule
// ═══════════════════════════════════════════════════════════════════════════════

/// A single grant: `subject` may perform `action` on resources matching `object`.
///
/// Object patterns:
/// - `*` matches any resource
/// - `/users/*` matches `/users` and everything below it
/// - `/users/:id` or `/users/{id}` matches exactly one non-empty segment
/// - anything else matches exactly
///
/// Actions compare case-insensitively; `*` matches any action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl PolicyRule {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
        }
    }

    /// Whether this rule grants `action` on `object` (subject is not checked).
    pub fn grants(&self, object: &str, action: &str) -> bool {
        action_matches(&self.action, action) && object_matches(&self.object, object)
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.subject, self.object, self.action)
    }
}

fn action_matches(pattern: &str, action: &str) -> bool {
    pattern == "*" || pattern.eq_ignore_ascii_case(action)
}

fn is_placeholder(segment: &str) -> bool {
    (segment.len() > 1 && segment.starts_with(':'))
        || (segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}'))
}

fn object_matches(pattern: &str, object: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix("/*") {
        return object == prefix
            || object
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'));
    }

    let expected: Vec<&str> = pattern.split('/').collect();
    let actual: Vec<&str> = object.split('/').collect();
    if expected.len() != actual.len() {
        return false;
    }

    expected.iter().zip(&actual).all(|(e, a)| {
        if is_placeholder(e) {
            !a.is_empty()
        } else {
            e == a
        }
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Memory Policy Engine
// ═══════════════════════════════════════════════════════════════════════════════

/// In-process rule table keyed by subject.
///
/// Thread-safe via `DashMap`. Never returns an error.
#[derive(Debug, Clone, Default)]
pub struct MemoryPolicyEngine {
    rules: Arc<DashMap<String, Vec<PolicyRule>>>,
}

impl MemoryPolicyEngine {
    /// Create an empty engine that denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine pre-loaded with `rules`.
    pub fn with_rules(rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        let engine = Self::new();
        for rule in rules {
            engine.add_rule(rule);
        }
        engine
    }

    /// Add a rule. Returns `false` if an identical rule already exists.
    pub fn add_rule(&self, rule: PolicyRule) -> bool {
        let mut entry = self.rules.entry(rule.subject.clone()).or_default();
        if entry.contains(&rule) {
            return false;
        }
        debug!(rule = %rule, "Adding policy rule");
        entry.push(rule);
        true
    }

    /// Remove a rule. Returns `true` if it was present.
    pub fn remove_rule(&self, rule: &PolicyRule) -> bool {
        match self.rules.get_mut(&rule.subject) {
            Some(mut entry) => {
                let before = entry.len();
                entry.retain(|r| r != rule);
                entry.len() != before
            }
            None => false,
        }
    }

    /// All rules granted to `subject`.
    pub fn rules_for(&self, subject: &str) -> Vec<PolicyRule> {
        self.rules
            .get(subject)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Total number of rules across all subjects.
    pub fn len(&self) -> usize {
        self.rules.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, subject: &str, object: &str, action: &str) -> bool {
        self.rules
            .get(subject)
            .is_some_and(|rules| rules.iter().any(|rule| rule.grants(object, action)))
    }
}

#[async_trait]
impl PolicyEngine for MemoryPolicyEngine {
    async fn enforce(
        &self,
        subject: &str,
        object: &str,
        action: &str,
    ) -> Result<bool, EnforcementError> {
        Ok(self.check(subject, object, action))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
