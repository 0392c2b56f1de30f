// crates/server/src/lib.rs
//! Stepwatch server library.
//!
//! Axum HTTP server exposing a single background step job: start it, poll
//! its progress, stream it over SSE, or cancel it. A small tool/resource
//! registry is served alongside.

pub mod cli;
pub mod error;
pub mod routes;
pub mod state;
pub mod tools;

pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, process control, tools and resources)
/// - CORS allowing any origin
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
