use std::sync::Arc;

use axum::{routing::get, Router};

use assistant_cell::router::assistant_routes;
use scheduling_cell::router::scheduling_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinica Mental API is running!" }))
        .nest("/api/appointments", scheduling_routes(state.clone()))
        .nest("/api/assistant", assistant_routes(state.clone()))
}
