use anyhow::Context;

use crate::common::{check_permission, ActionError, CurrentSubject};
use crate::domains::permissions::data::{ACTION_READ, RESOURCE};
use crate::domains::policy::PolicySet;
use crate::kernel::ServerDeps;

/// Current persisted policy set
pub async fn list_rules(
    session: &CurrentSubject,
    deps: &ServerDeps,
) -> Result<PolicySet, ActionError> {
    check_permission(session, deps, RESOURCE, ACTION_READ)?;

    let policy = deps
        .policy_store()
        .load_policy()
        .await
        .context("Failed to load policy set")?;
    Ok(policy)
}
