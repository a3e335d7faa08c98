//! HTTP surface: handlers and the router that wires them.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

pub mod handlers {
    pub use crate::handlers::*;
}

/// Lead forms are a few hundred bytes; anything near this is not a lead.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the application router.
pub fn router(state: Arc<handlers::AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/leads", post(handlers::create_lead))
        .route("/api/calculator", get(handlers::calculate_repayment))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
