//! Policy enforcer.
//!
//! Holds the compiled policy as an immutable snapshot. Reads clone the
//! snapshot pointer and evaluate without holding any lock; reloads build a
//! complete new enforcer and swap the pointer, so a reader never observes a
//! half-loaded policy. Reloads run one at a time so the last swap always
//! carries the most recent read of the store.

use anyhow::{Context, Result};
use casbin::{CoreApi, Enforcer, MemoryAdapter, MgmtApi};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

use super::model::policy_model;
use super::PolicySet;
use crate::kernel::BasePolicyStore;

/// Build an in-memory Casbin enforcer from a loaded policy set.
///
/// Duplicate rows in storage are tolerated: Casbin reports them as
/// not-added and the rule is already present.
pub async fn build_enforcer(policy: &PolicySet) -> casbin::Result<Enforcer> {
    let model = policy_model().await?;
    let adapter = MemoryAdapter::default();
    let mut enforcer = Enforcer::new(model, adapter).await?;

    for rule in &policy.rules {
        enforcer.add_policy(rule.to_fields()).await?;
    }

    for assignment in &policy.assignments {
        enforcer.add_grouping_policy(assignment.to_fields()).await?;
    }

    // Role links must be rebuilt after all groupings are in place.
    enforcer.build_role_links()?;
    Ok(enforcer)
}

/// Size of the active snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PolicyStats {
    pub rules: usize,
    pub assignments: usize,
}

/// Compiled enforcer plus the counts taken when it was built
struct Snapshot {
    enforcer: Enforcer,
    stats: PolicyStats,
}

impl Snapshot {
    fn new(enforcer: Enforcer) -> Self {
        let stats = PolicyStats {
            rules: enforcer.get_policy().len(),
            assignments: enforcer.get_grouping_policy().len(),
        };
        Self { enforcer, stats }
    }
}

/// Answers "may subject S perform action A on resource R?"
pub struct PolicyEnforcer {
    store: Arc<dyn BasePolicyStore>,
    snapshot: RwLock<Arc<Snapshot>>,
    reload_lock: Mutex<()>,
}

impl std::fmt::Debug for PolicyEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEnforcer").finish_non_exhaustive()
    }
}

impl PolicyEnforcer {
    /// Load the persisted policy set from `store` and compile it.
    ///
    /// Errors leave nothing behind; callers decide whether to retry.
    pub async fn initialize(store: Arc<dyn BasePolicyStore>) -> Result<Self> {
        let policy = store
            .load_policy()
            .await
            .context("Failed to load policy set")?;
        let enforcer = build_enforcer(&policy)
            .await
            .context("Failed to compile policy set")?;

        tracing::info!(
            rules = policy.rules.len(),
            assignments = policy.assignments.len(),
            "Policy enforcer initialized"
        );

        Ok(Self {
            store,
            snapshot: RwLock::new(Arc::new(Snapshot::new(enforcer))),
            reload_lock: Mutex::new(()),
        })
    }

    /// Evaluate a request against the current snapshot.
    ///
    /// Never fails: evaluation errors are logged and reported as deny.
    /// Blank inputs and a policy without rules are denied before Casbin
    /// is consulted, since its matcher treats empty fields as equal.
    pub fn enforce(&self, subject_id: &str, resource: &str, action: &str) -> bool {
        if [subject_id, resource, action]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return false;
        }

        let snapshot = self.current();
        if snapshot.stats.rules == 0 {
            return false;
        }

        match snapshot.enforcer.enforce((subject_id, resource, action)) {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    subject_id,
                    resource,
                    action,
                    "Policy evaluation failed; denying"
                );
                false
            }
        }
    }

    /// Re-read the store and swap in a freshly compiled snapshot.
    ///
    /// On failure the previous snapshot stays active. Concurrent callers
    /// queue behind each other, so a slow reload of an older store state
    /// cannot overwrite a newer one.
    pub async fn reload(&self) -> Result<()> {
        let _reloading = self.reload_lock.lock().await;

        let policy = self
            .store
            .load_policy()
            .await
            .context("Failed to reload policy set")?;
        let enforcer = build_enforcer(&policy)
            .await
            .context("Failed to compile reloaded policy set")?;

        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(Snapshot::new(enforcer));
        drop(guard);

        tracing::info!(
            rules = policy.rules.len(),
            assignments = policy.assignments.len(),
            "Policy set reloaded"
        );
        Ok(())
    }

    pub fn stats(&self) -> PolicyStats {
        self.current().stats
    }

    /// Store the policy was loaded from
    pub fn store(&self) -> &Arc<dyn BasePolicyStore> {
        &self.store
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
