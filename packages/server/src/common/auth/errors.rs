use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Authorization errors for the municipal management dashboard
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Not authorized to {action} {resource}")]
    NotAuthorized { resource: String, action: String },

    #[error("Upstream service unavailable: {0}")]
    Upstream(String),
}

impl AuthError {
    pub fn not_authorized(resource: &str, action: &str) -> Self {
        Self::NotAuthorized {
            resource: resource.to_string(),
            action: action.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            Self::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to show end users. Policy details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "Not authenticated",
            Self::NotAuthorized { .. } => "You do not have permission to perform this action",
            Self::Upstream(_) => "Service temporarily unavailable",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            Self::NotAuthenticated | Self::NotAuthorized { .. } => {
                tracing::debug!(error = %self, "request rejected")
            }
            Self::Upstream(_) => tracing::error!(error = %self, "request failed"),
        }
        (
            self.status_code(),
            Json(json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}
