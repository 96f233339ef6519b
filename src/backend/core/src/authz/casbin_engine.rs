//! Casbin-backed policy engine.
//!
//! Loads a Casbin model plus policy rules either from files (`model.conf`,
//! `policy.csv`) or from memory, and answers `enforce(role, path, method)`.
//! The enforcer sits behind a `parking_lot::RwLock`: checks take the read
//! side, [`CasbinPolicyEngine::reload`] builds a fresh enforcer off-lock and
//! swaps it in under the write side.

use async_trait::async_trait;
use casbin::{CoreApi, DefaultModel, Enforcer, FileAdapter, MemoryAdapter, MgmtApi};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::policy::{EnforcementError, PolicyEngine, PolicyRule};
use crate::error::Result;

/// Default model: role inheritance via `g`, `keyMatch2` paths, exact or `*` actions.
pub const DEFAULT_MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && keyMatch2(r.obj, p.obj) && (r.act == p.act || p.act == "*")
"#;

#[derive(Debug, Clone)]
enum PolicySource {
    Files {
        model_path: PathBuf,
        policy_path: PathBuf,
    },
    Inline {
        model: String,
        rules: Vec<PolicyRule>,
    },
}

/// [`PolicyEngine`] backed by a `casbin::Enforcer`.
pub struct CasbinPolicyEngine {
    enforcer: RwLock<Enforcer>,
    source: PolicySource,
}

impl std::fmt::Debug for CasbinPolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CasbinPolicyEngine")
            .field("source", &self.source)
            .field("rules", &self.rule_count())
            .finish()
    }
}

impl CasbinPolicyEngine {
    /// Load a model file and a CSV policy file.
    pub async fn from_files(
        model_path: impl AsRef<Path>,
        policy_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let source = PolicySource::Files {
            model_path: model_path.as_ref().to_path_buf(),
            policy_path: policy_path.as_ref().to_path_buf(),
        };
        Self::from_source(source).await
    }

    /// Build from a model string and an in-memory rule list.
    pub async fn from_model_str(
        model: impl Into<String>,
        rules: impl IntoIterator<Item = PolicyRule>,
    ) -> Result<Self> {
        let source = PolicySource::Inline {
            model: model.into(),
            rules: rules.into_iter().collect(),
        };
        Self::from_source(source).await
    }

    /// Build from [`DEFAULT_MODEL`] and an in-memory rule list.
    pub async fn with_rules(rules: impl IntoIterator<Item = PolicyRule>) -> Result<Self> {
        Self::from_model_str(DEFAULT_MODEL, rules).await
    }

    async fn from_source(source: PolicySource) -> Result<Self> {
        let enforcer = build_enforcer(&source).await?;
        Ok(Self {
            enforcer: RwLock::new(enforcer),
            source,
        })
    }

    /// Rebuild the enforcer from its original source and swap it in.
    ///
    /// On failure the previous enforcer stays active.
    pub async fn reload(&self) -> Result<()> {
        let enforcer = build_enforcer(&self.source).await?;
        *self.enforcer.write() = enforcer;
        info!(rules = self.rule_count(), "Reloaded casbin policy");
        Ok(())
    }

    /// Number of `p` rules currently loaded.
    pub fn rule_count(&self) -> usize {
        self.enforcer.read().get_policy().len()
    }
}

async fn build_enforcer(source: &PolicySource) -> Result<Enforcer> {
    match source {
        PolicySource::Files {
            model_path,
            policy_path,
        } => {
            debug!(
                model = %model_path.display(),
                policy = %policy_path.display(),
                "Loading casbin policy from files"
            );
            let model = DefaultModel::from_file(model_path).await?;
            let adapter = FileAdapter::new(policy_path.clone());
            Ok(Enforcer::new(model, adapter).await?)
        }
        PolicySource::Inline { model, rules } => {
            let model = DefaultModel::from_str(model).await?;
            let mut enforcer = Enforcer::new(model, MemoryAdapter::default()).await?;
            for rule in rules {
                enforcer
                    .add_policy(vec![
                        rule.subject.clone(),
                        rule.object.clone(),
                        rule.action.clone(),
                    ])
                    .await?;
            }
            Ok(enforcer)
        }
    }
}

#[async_trait]
impl PolicyEngine for CasbinPolicyEngine {
    async fn enforce(
        &self,
        subject: &str,
        object: &str,
        action: &str,
    ) -> std::result::Result<bool, EnforcementError> {
        self.enforcer
            .read()
            .enforce((subject, object, action))
            .map_err(|e| EnforcementError::Engine(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "casbin"
    }
}
