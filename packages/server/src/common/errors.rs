use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use super::auth::AuthError;

/// Errors returned by domain actions
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream service failed: {0}")]
    Upstream(#[source] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ActionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(e) => e.into_response(),
            Self::InvalidInput(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::Upstream(e) => {
                tracing::error!(error = %e, "Upstream failure during action");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Upstream service failed" })),
                )
                    .into_response()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "Action failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
