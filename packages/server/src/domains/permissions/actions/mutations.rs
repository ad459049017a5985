//! Permissions mutation actions
//!
//! Each action checks permission first, writes through the store, then
//! reloads the enforcer. A failed reload is reported but the write stands;
//! the next successful reload picks it up.

use anyhow::Context;
use tracing::info;

use crate::common::{check_permission, ActionError, CurrentSubject};
use crate::domains::permissions::data::{
    validate_assignment, validate_rule, ACTION_CREATE, ACTION_DELETE, ACTION_UPDATE, RESOURCE,
};
use crate::domains::policy::{PolicyRule, RoleAssignment};
use crate::kernel::ServerDeps;

/// Add a rule. Returns false if it was already present.
pub async fn grant_rule(
    session: &CurrentSubject,
    deps: &ServerDeps,
    rule: PolicyRule,
) -> Result<bool, ActionError> {
    let permit = check_permission(session, deps, RESOURCE, ACTION_CREATE)?;
    validate_rule(&rule)?;

    let added = deps
        .policy_store()
        .add_rule(&rule)
        .await
        .context("Failed to store policy rule")?;
    if added {
        deps.enforcer.reload().await?;
    }

    info!(
        by = %permit.subject.id,
        subject = %rule.subject,
        resource = %rule.resource,
        action = %rule.action,
        effect = %rule.effect,
        added,
        "Policy rule granted"
    );
    Ok(added)
}

/// Remove a rule. Returns false if no such rule existed.
pub async fn revoke_rule(
    session: &CurrentSubject,
    deps: &ServerDeps,
    rule: PolicyRule,
) -> Result<bool, ActionError> {
    let permit = check_permission(session, deps, RESOURCE, ACTION_DELETE)?;
    validate_rule(&rule)?;

    let removed = deps
        .policy_store()
        .remove_rule(&rule)
        .await
        .context("Failed to remove policy rule")?;
    if removed {
        deps.enforcer.reload().await?;
    }

    info!(
        by = %permit.subject.id,
        subject = %rule.subject,
        resource = %rule.resource,
        action = %rule.action,
        removed,
        "Policy rule revoked"
    );
    Ok(removed)
}

/// Link a subject to a role
pub async fn assign_role(
    session: &CurrentSubject,
    deps: &ServerDeps,
    assignment: RoleAssignment,
) -> Result<bool, ActionError> {
    let permit = check_permission(session, deps, RESOURCE, ACTION_UPDATE)?;
    validate_assignment(&assignment)?;

    let added = deps
        .policy_store()
        .add_assignment(&assignment)
        .await
        .context("Failed to store role assignment")?;
    if added {
        deps.enforcer.reload().await?;
    }

    info!(
        by = %permit.subject.id,
        subject = %assignment.subject,
        role = %assignment.role,
        added,
        "Role assigned"
    );
    Ok(added)
}

/// Remove a subject's role link
pub async fn unassign_role(
    session: &CurrentSubject,
    deps: &ServerDeps,
    assignment: RoleAssignment,
) -> Result<bool, ActionError> {
    let permit = check_permission(session, deps, RESOURCE, ACTION_UPDATE)?;
    validate_assignment(&assignment)?;

    let removed = deps
        .policy_store()
        .remove_assignment(&assignment)
        .await
        .context("Failed to remove role assignment")?;
    if removed {
        deps.enforcer.reload().await?;
    }

    info!(
        by = %permit.subject.id,
        subject = %assignment.subject,
        role = %assignment.role,
        removed,
        "Role unassigned"
    );
    Ok(removed)
}
