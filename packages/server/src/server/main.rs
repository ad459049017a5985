// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use gestao_core::domains::policy;
use gestao_core::kernel::{ServerDeps, SupabaseAdmin, SupabaseAuth};
use gestao_core::server::{build_app, AppState};
use gestao_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gestao_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gestão Municipal API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to the policy store and compile the policy
    tracing::info!("Initializing policy enforcer...");
    let enforcer = policy::initialize()
        .await
        .context("Failed to initialize policy enforcer")?;
    tracing::info!("Policy enforcer ready");

    let auth = SupabaseAuth::new(&config.supabase_url, config.supabase_anon_key.clone())
        .context("Failed to create auth client")?;
    let auth_admin =
        SupabaseAdmin::new(&config.supabase_url, config.supabase_service_role_key.clone())
            .context("Failed to create admin auth client")?;

    let deps = ServerDeps::new(
        enforcer,
        Arc::new(auth),
        Arc::new(auth_admin),
        config.session_cookie_secure,
    );

    // Build application
    let app = build_app(AppState::new(deps));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!(
        "Health check: http://localhost:{}/api/public/health",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
