//! API route handlers for the stepwatch server.

pub mod health;
pub mod invocables;
pub mod process;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check with current job status
/// - POST /api/start-process - Start a job run (202, or 409 when rejecting overlap)
/// - GET  /api/status - Snapshot of the current job run
/// - GET  /api/status/stream - SSE stream of the current job run
/// - POST /api/cancel-process - Cancel the running job
/// - GET  /api/tools - List tools
/// - POST /api/tools/{name} - Call a tool
/// - GET  /api/resources - List resource templates
/// - GET  /api/resources/read?uri= - Read a resource
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", process::router())
        .nest("/api", invocables::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwatch_jobs::JobConfig;

    #[tokio::test]
    async fn test_api_routes_creation() {
        let state = AppState::new(JobConfig::default());
        let _router = api_routes(state);
    }
}
