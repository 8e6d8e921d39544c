use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::main_lib::AppState;
use crate::telegram;

mod counters;
mod health;

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/me", get(counters::me))
        .route("/api/click", post(counters::click))
        .route("/api/name", post(counters::set_name))
        .route("/bot/webhook", post(telegram::webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
