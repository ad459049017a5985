//! Application setup and server configuration.

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::middleware::{session_gate, GateState};
use crate::server::routes::{
    assign_role_handler, create_employee_handler, grant_permission_handler, health_handler,
    list_permissions_handler, login_handler, logout_handler, me_handler,
    revoke_permission_handler, unassign_role_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
}

impl AppState {
    pub fn new(deps: ServerDeps) -> Self {
        Self { deps }
    }
}

/// Build the Axum application router
///
/// Every route sits behind the session gate. Handlers read the resolved
/// subject through `CurrentSubject` and authorize with the permission guard.
pub fn build_app(state: AppState) -> Router {
    let gate = GateState::new(state.deps.auth.clone(), state.deps.cookie_secure);

    // Same-origin dashboard; cookies are sent without credentialed CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        // Session
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/api/me", get(me_handler))
        // Health check (public)
        .route("/api/public/health", get(health_handler))
        // Policy administration
        .route(
            "/api/permissions",
            get(list_permissions_handler)
                .post(grant_permission_handler)
                .delete(revoke_permission_handler),
        )
        .route(
            "/api/permissions/assignments",
            post(assign_role_handler).delete(unassign_role_handler),
        )
        .route("/api/employees", post(create_employee_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn_with_state(gate, session_gate))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
