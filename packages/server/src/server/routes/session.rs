use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::auth::{SessionCookies, SessionTokens};
use crate::common::{AuthError, CurrentSubject, Subject};
use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub subject: Subject,
}

/// Exchange email and password for a session.
///
/// Rejected credentials return 401 with the same body whether the account
/// exists or not.
pub async fn login_handler(
    Extension(state): Extension<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let email = input.email.trim();

    let signed_in = state
        .deps
        .auth
        .sign_in_with_password(email, &input.password)
        .await
        .map_err(|e| AuthError::Upstream(e.to_string()))?;

    let Some((subject, tokens)) = signed_in else {
        warn!("Login rejected");
        return Err(AuthError::NotAuthenticated);
    };

    info!(subject_id = %subject.id, "User signed in");

    let mut response = Json(SessionResponse { subject }).into_response();
    tokens.write_to(response.headers_mut(), state.deps.cookie_secure);
    Ok(response)
}

/// End the session at the provider and clear the cookies.
///
/// Provider failures are logged; the browser session is cleared regardless.
pub async fn logout_handler(
    Extension(state): Extension<AppState>,
    refreshed: Option<Extension<SessionTokens>>,
    headers: HeaderMap,
) -> Response {
    // A token minted by the gate during this request supersedes the cookie
    let access_token = match refreshed {
        Some(Extension(tokens)) => Some(tokens.access_token),
        None => SessionCookies::from_headers(&headers).access_token,
    };

    if let Some(token) = access_token {
        if let Err(e) = state.deps.auth.sign_out(&token).await {
            warn!(error = %e, "Provider sign-out failed");
        }
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    for value in SessionTokens::clear_cookie_headers(state.deps.cookie_secure) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

pub async fn me_handler(current: CurrentSubject) -> Result<Json<Subject>, AuthError> {
    current
        .0
        .map(Json)
        .ok_or(AuthError::NotAuthenticated)
}
