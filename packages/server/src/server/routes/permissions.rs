use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::common::{ActionError, CurrentSubject};
use crate::domains::permissions::actions::{
    assign_role, grant_rule, list_rules, revoke_rule, unassign_role,
};
use crate::domains::policy::{PolicyRule, PolicySet, RoleAssignment};
use crate::server::app::AppState;

#[derive(Debug, Serialize)]
pub struct ChangeResponse {
    pub changed: bool,
}

fn change(changed: bool, created: bool) -> (StatusCode, Json<ChangeResponse>) {
    let status = if changed && created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(ChangeResponse { changed }))
}

pub async fn list_permissions_handler(
    Extension(state): Extension<AppState>,
    current: CurrentSubject,
) -> Result<Json<PolicySet>, ActionError> {
    Ok(Json(list_rules(&current, &state.deps).await?))
}

pub async fn grant_permission_handler(
    Extension(state): Extension<AppState>,
    current: CurrentSubject,
    Json(rule): Json<PolicyRule>,
) -> Result<(StatusCode, Json<ChangeResponse>), ActionError> {
    let added = grant_rule(&current, &state.deps, rule).await?;
    Ok(change(added, true))
}

pub async fn revoke_permission_handler(
    Extension(state): Extension<AppState>,
    current: CurrentSubject,
    Json(rule): Json<PolicyRule>,
) -> Result<(StatusCode, Json<ChangeResponse>), ActionError> {
    let removed = revoke_rule(&current, &state.deps, rule).await?;
    Ok(change(removed, false))
}

pub async fn assign_role_handler(
    Extension(state): Extension<AppState>,
    current: CurrentSubject,
    Json(assignment): Json<RoleAssignment>,
) -> Result<(StatusCode, Json<ChangeResponse>), ActionError> {
    let added = assign_role(&current, &state.deps, assignment).await?;
    Ok(change(added, true))
}

pub async fn unassign_role_handler(
    Extension(state): Extension<AppState>,
    current: CurrentSubject,
    Json(assignment): Json<RoleAssignment>,
) -> Result<(StatusCode, Json<ChangeResponse>), ActionError> {
    let removed = unassign_role(&current, &state.deps, assignment).await?;
    Ok(change(removed, false))
}
