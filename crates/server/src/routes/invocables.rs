// crates/server/src/routes/invocables.rs
//! Tool and resource endpoints.
//!
//! - GET /tools - list tools with their input schemas
//! - POST /tools/{name} - call a tool with a JSON argument object
//! - GET /resources - list resource templates
//! - GET /resources/read?uri= - render a resource

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::tools::{ResourceSpec, ToolSpec};

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct ToolResult {
    pub result: Value,
}

#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    pub uri: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct ResourceContents {
    pub uri: String,
    pub text: String,
}

/// GET /api/tools
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Vec<ToolSpec>> {
    Json(state.tools.tools())
}

/// POST /api/tools/{name}
pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> ApiResult<Json<ToolResult>> {
    let result = state.tools.invoke(&name, &args)?;
    Ok(Json(ToolResult { result }))
}

/// GET /api/resources
pub async fn list_resources(State(state): State<Arc<AppState>>) -> Json<Vec<ResourceSpec>> {
    Json(state.tools.resources())
}

/// GET /api/resources/read?uri=greeting://Ada
pub async fn read_resource(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReadQuery>,
) -> ApiResult<Json<ResourceContents>> {
    let text = state.tools.read(&query.uri)?;
    Ok(Json(ResourceContents {
        uri: query.uri,
        text,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(call_tool))
        .route("/resources", get(list_resources))
        .route("/resources/read", get(read_resource))
}
