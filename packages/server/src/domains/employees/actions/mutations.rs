use anyhow::Context;
use tracing::info;

use crate::common::{check_permission, ActionError, AuthError, CurrentSubject, Role, Subject};
use crate::domains::employees::{NewEmployee, RESOURCE};
use crate::domains::permissions;
use crate::domains::policy::RoleAssignment;
use crate::kernel::ServerDeps;

/// Invite an employee and assign the requested role.
///
/// Handing out the admin role additionally requires the caller to be able to
/// update permissions.
pub async fn create_employee(
    session: &CurrentSubject,
    deps: &ServerDeps,
    employee: NewEmployee,
) -> Result<Subject, ActionError> {
    let permit = check_permission(session, deps, RESOURCE, "create")?;

    if employee.role == Role::Admin
        && !permit.can(permissions::RESOURCE, permissions::data::ACTION_UPDATE)
    {
        tracing::warn!(
            subject_id = %permit.subject.id,
            "Attempt to create an admin without permission to update permissions"
        );
        return Err(AuthError::not_authorized(
            permissions::RESOURCE,
            permissions::data::ACTION_UPDATE,
        )
        .into());
    }

    employee.validate()?;

    info!(email = %employee.email, role = %employee.role, "Inviting employee");

    let subject = deps
        .auth_admin
        .invite_user(&employee)
        .await
        .map_err(ActionError::Upstream)?;

    // The invite cannot be rolled back; make the orphaned account traceable
    if let Err(e) = assign_invited_role(deps, &subject).await {
        tracing::error!(
            error = %e,
            employee_id = %subject.id,
            email = %subject.email,
            role = %subject.role,
            "Employee invited but role assignment failed"
        );
        return Err(e
            .context(format!(
                "Employee {} was invited but has no role yet",
                subject.id
            ))
            .into());
    }

    info!(
        by = %permit.subject.id,
        employee_id = %subject.id,
        role = %subject.role,
        "Employee created"
    );
    Ok(subject)
}

async fn assign_invited_role(deps: &ServerDeps, subject: &Subject) -> anyhow::Result<()> {
    deps.policy_store()
        .add_assignment(&RoleAssignment::new(
            &subject.policy_id(),
            subject.role.as_str(),
        ))
        .await
        .context("Failed to store role assignment for new employee")?;
    deps.enforcer.reload().await
}
