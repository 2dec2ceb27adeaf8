mod config;
mod errors;
mod handlers;
mod middleware;
mod models;

use anyhow::Result;
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use identity_client::{IdentityAdmin, JwtVerifier};
use shared::{init_logging, LogConfig, Localizer};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_logging(LogConfig::from_env("user-service")?)?;
    info!("Starting User Service...");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    let localizer = match &config.localization.locales_dir {
        Some(dir) => Localizer::from_dir(dir)?,
        None => Localizer::builtin(),
    }
    .with_default_locale(config.localization.default_locale.clone());
    Localizer::install(Arc::new(localizer));

    let app_state = Arc::new(AppState {
        admin: IdentityAdmin::new(config.identity.clone()),
        verifier: JwtVerifier::new(config.identity.clone()),
        config: config.clone(),
    });
    info!(realm = %config.identity.realm, "Identity provider client initialized");

    let app = app(app_state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("User Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn app(state: Arc<AppState>) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Admin endpoints
    let admin = Router::new()
        .route(
            "/api/v1/users/:user_id",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )
        .route(
            "/api/v1/users/:user_id/attributes/:name",
            put(handlers::users::set_attribute),
        )
        .route("/api/v1/users/:user_id/roles", post(handlers::users::assign_role))
        .route(
            "/api/v1/users/:user_id/roles/:role_id",
            delete(handlers::users::revoke_role),
        )
        .route("/api/v1/roles", post(handlers::roles::create_role))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(admin)
        .layer(axum_middleware::from_fn(middleware::locale_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct AppState {
    pub config: Config,
    pub admin: IdentityAdmin,
    pub verifier: JwtVerifier,
}
