pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        // Authenticated API routes
        .nest("/api", api_routes(app_state.clone()))
        // Public routes (reveal page, checkout return, pricing)
        .nest("/public", public_routes())
        // Add state to the router
        .with_state(app_state)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new().nest("/moments", moment_routes(state))
}

fn moment_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::moments::list))
        .route("/", post(handlers::moments::create))
        .route("/:id", get(handlers::moments::get))
        .route("/:id", delete(handlers::moments::delete))
        .route("/:id/steps/:step", put(handlers::moments::update_step))
        .route("/:id/quote", get(handlers::moments::quote))
        .route("/:id/payments", get(handlers::moments::list_payments))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/pricing", get(handlers::pricing::pricing))
        .route("/payments/verify", post(handlers::payments::verify))
        .route("/reveal-check", get(handlers::reveal::reveal_check))
        .route("/reveal-unlock", post(handlers::reveal::reveal_unlock))
        .route("/moments/:id_or_slug", get(handlers::moments::public_view))
}
