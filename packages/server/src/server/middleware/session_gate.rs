use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use super::route_table::{RouteClass, RouteTable, FROM_PARAM, LANDING_PATH, LOGIN_PATH, ROOT_PATH};
use crate::common::auth::{
    CurrentSubject, SessionCookies, SessionResolution, ACCESS_TOKEN_COOKIE,
};
use crate::kernel::BaseAuthProvider;

/// Terminal state of the gate for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    PublicAllowed,
    /// Signed-in user asked for the root or login page
    PublicRedirectAuthenticated,
    ProtectedAllowed,
    ProtectedRedirectUnauthenticated,
}

/// Pure routing decision from the path class and session state
pub fn decide(class: RouteClass, path: &str, authenticated: bool) -> GateDecision {
    match class {
        RouteClass::StaticAsset => GateDecision::PublicAllowed,
        RouteClass::Public => {
            let is_entry_page = path == ROOT_PATH || path.trim_end_matches('/') == LOGIN_PATH;
            if authenticated && is_entry_page {
                GateDecision::PublicRedirectAuthenticated
            } else {
                GateDecision::PublicAllowed
            }
        }
        RouteClass::Protected => {
            if authenticated {
                GateDecision::ProtectedAllowed
            } else {
                GateDecision::ProtectedRedirectUnauthenticated
            }
        }
    }
}

/// Login URL that sends the user back to `path` afterwards
pub fn login_redirect_location(path: &str) -> String {
    format!("{LOGIN_PATH}?{FROM_PARAM}={}", urlencoding::encode(path))
}

/// State for the session gate. Holds the public auth client only.
#[derive(Clone)]
pub struct GateState {
    pub auth: Arc<dyn BaseAuthProvider>,
    pub routes: RouteTable,
    pub cookie_secure: bool,
}

impl GateState {
    pub fn new(auth: Arc<dyn BaseAuthProvider>, cookie_secure: bool) -> Self {
        Self {
            auth,
            routes: RouteTable::default(),
            cookie_secure,
        }
    }
}

/// Session gate middleware
///
/// Runs before every route:
/// 1. Validates (and possibly refreshes) the session with the auth provider
/// 2. Classifies the path as public or protected
/// 3. Redirects anonymous users away from protected paths and signed-in
///    users away from the login page
///
/// Allowed requests carry `CurrentSubject` in their extensions, plus the new
/// `SessionTokens` when the session was refreshed. Refreshed session cookies
/// are written to whatever response the gate returns.
pub async fn session_gate(
    State(gate): State<GateState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let class = gate.routes.classify(&path);

    if class == RouteClass::StaticAsset {
        return next.run(request).await;
    }

    let cookies = SessionCookies::from_headers(request.headers());
    let resolution = resolve_session(gate.auth.as_ref(), &cookies).await;
    let authenticated = resolution.subject.is_some();
    let decision = decide(class, &path, authenticated);

    debug!(path = %path, ?decision, authenticated, "Session gate");

    let mut response = match decision {
        GateDecision::PublicRedirectAuthenticated => {
            Redirect::temporary(LANDING_PATH).into_response()
        }
        GateDecision::ProtectedRedirectUnauthenticated => {
            Redirect::temporary(&login_redirect_location(&path)).into_response()
        }
        GateDecision::PublicAllowed | GateDecision::ProtectedAllowed => {
            let extensions = request.extensions_mut();
            extensions.insert(CurrentSubject(resolution.subject.clone()));
            if let Some(tokens) = &resolution.refreshed {
                extensions.insert(tokens.clone());
            }
            next.run(request).await
        }
    };

    // Handlers that set session cookies themselves (login, logout) win
    if let Some(tokens) = &resolution.refreshed {
        if !sets_session_cookie(response.headers()) {
            tokens.write_to(response.headers_mut(), gate.cookie_secure);
        }
    }

    response
}

fn sets_session_cookie(headers: &HeaderMap) -> bool {
    headers.get_all(SET_COOKIE).iter().any(|value| {
        value
            .to_str()
            .map(|raw| raw.starts_with(&format!("{ACCESS_TOKEN_COOKIE}=")))
            .unwrap_or(false)
    })
}

/// Provider errors degrade to an anonymous session; the gate itself never
/// fails a request.
async fn resolve_session(auth: &dyn BaseAuthProvider, cookies: &SessionCookies) -> SessionResolution {
    if cookies.is_empty() {
        return SessionResolution::anonymous();
    }

    match auth.resolve_session(cookies).await {
        Ok(resolution) => resolution,
        Err(e) => {
            warn!(error = %e, "Session validation failed; treating request as anonymous");
            SessionResolution::anonymous()
        }
    }
}
