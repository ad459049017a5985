use axum::{extract::Extension, http::StatusCode, Json};

use crate::common::{ActionError, CurrentSubject, Subject};
use crate::domains::employees::actions::create_employee;
use crate::domains::employees::NewEmployee;
use crate::server::app::AppState;

pub async fn create_employee_handler(
    Extension(state): Extension<AppState>,
    current: CurrentSubject,
    Json(employee): Json<NewEmployee>,
) -> Result<(StatusCode, Json<Subject>), ActionError> {
    let subject = create_employee(&current, &state.deps, employee).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}
