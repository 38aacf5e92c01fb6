use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use doorstep::config::AppConfig;
use doorstep::handlers;
use doorstep::session::{FileStorage, Session};
use doorstep::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let session = Session::restore(Box::new(FileStorage::new(config.session_file.clone())))?;
    let state = Arc::new(AppState::new(config.clone(), Arc::new(session)));
    tracing::info!("using marketplace API at {}", config.api_base_url);

    match config.dashboard_credentials() {
        Some((email, password)) => match state.auth.login(&email, &password).await {
            Ok(user) => tracing::info!(user_id = user.id, role = %user.role, "dashboard logged in"),
            Err(e) => tracing::warn!(error = %e, "dashboard login failed"),
        },
        None if state.auth.is_authenticated() => match state.auth.fetch_profile().await {
            Ok(user) => tracing::info!(user_id = user.id, role = %user.role, "restored saved session"),
            Err(e) => tracing::warn!(error = %e, role = ?state.auth.role(), "restored session without profile"),
        },
        None => tracing::warn!("no session; set DASHBOARD_EMAIL and DASHBOARD_PASSWORD to log in"),
    }

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/api/bookings", get(handlers::bookings::get_bookings))
        .route(
            "/api/bookings/:id/status",
            post(handlers::bookings::update_booking_status),
        )
        .route("/api/services", get(handlers::services::get_services))
        .route("/api/profile", get(handlers::profile::get_profile))
        .route(
            "/api/profile/request-provider",
            post(handlers::profile::request_provider),
        )
        .route(
            "/api/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/api/notifications/:id/dismiss",
            post(handlers::notifications::dismiss_notification),
        )
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting dashboard on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    state.close();
    Ok(())
}
