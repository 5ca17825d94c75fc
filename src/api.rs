//! REST API for the road network.
//!
//! Provides endpoints for:
//! - Loading a graph document (or a demo city) into the server
//! - Replaying a queries document against the loaded graph
//! - Demo data retrieval
//! - Swagger UI at /q/swagger-ui

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::demo_data::{available_datasets, generate_by_name};
use crate::document::{GraphDocument, OutputDocument, QueriesDocument};
use crate::events::replay;
use crate::graph::{Graph, GraphStats};

/// Graph currently served, with the id of the document it came from.
struct LoadedGraph {
    id: String,
    graph: Graph,
}

/// Application state shared across handlers.
///
/// Replays mutate the graph, so they take the write lock and run one at a
/// time.
pub struct AppState {
    loaded: RwLock<Option<LoadedGraph>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            loaded: RwLock::new(None),
        }
    }

    fn install(&self, doc: GraphDocument) -> GraphResponse {
        let id = doc.meta.id.clone();
        let graph = doc.into_graph();
        let stats = graph.stats();
        info!("Serving graph '{}' ({} nodes, {} arcs)", id, stats.node_count, stats.arc_count);

        *self.loaded.write() = Some(LoadedGraph { id: id.clone(), graph });
        GraphResponse { id, stats }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates the API router with CORS and Swagger UI enabled.
pub fn create_router() -> Router {
    router(Arc::new(AppState::new()))
}

/// Creates the API router over an existing state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & Info
        .route("/health", get(health))
        .route("/info", get(info))
        // Graph
        .route("/graph", put(load_graph))
        .route("/graph", get(get_graph))
        .route("/events", post(post_events))
        // Demo data
        .route("/demo-data", get(list_demo_data))
        .route("/demo-data/{name}", get(get_demo_data))
        .route("/demo-data/{name}/load", put(load_demo_data))
        // Swagger UI at /q/swagger-ui (Quarkus-style path)
        .merge(SwaggerUi::new("/q/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state)
}

/// Error body returned with every non-2xx status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

// ============================================================================
// Health & Info
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Status indicator ("UP" when healthy).
    pub status: &'static str,
}

/// GET /health - Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}

/// Application info response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    /// Search algorithms offered by the query endpoint.
    pub algorithms: Vec<String>,
}

/// GET /info - Application info endpoint.
#[utoipa::path(
    get,
    path = "/info",
    responses((status = 200, description = "Application info", body = InfoResponse))
)]
async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "Road Network",
        version: env!("CARGO_PKG_VERSION"),
        algorithms: ["a_star", "knn_euclidean", "knn_network"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

// ============================================================================
// Graph & Events
// ============================================================================

/// Id and size of the served graph.
#[derive(Debug, Serialize, ToSchema)]
pub struct GraphResponse {
    pub id: String,
    pub stats: GraphStats,
}

/// PUT /graph - Replace the served graph with a graph document.
#[utoipa::path(
    put,
    path = "/graph",
    request_body(content = String, description = "graph.json document", content_type = "application/json"),
    responses(
        (status = 200, description = "Graph loaded", body = GraphResponse),
        (status = 400, description = "Malformed or invalid document", body = ErrorResponse)
    )
)]
async fn load_graph(State(state): State<Arc<AppState>>, body: String) -> Result<Json<GraphResponse>, ApiError> {
    let doc = GraphDocument::from_json_str(&body).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    Ok(Json(state.install(doc)))
}

/// GET /graph - Describe the served graph.
#[utoipa::path(
    get,
    path = "/graph",
    responses(
        (status = 200, description = "Graph summary", body = GraphResponse),
        (status = 404, description = "No graph loaded", body = ErrorResponse)
    )
)]
async fn get_graph(State(state): State<Arc<AppState>>) -> Result<Json<GraphResponse>, ApiError> {
    let loaded = state.loaded.read();
    match loaded.as_ref() {
        Some(loaded) => Ok(Json(GraphResponse {
            id: loaded.id.clone(),
            stats: loaded.graph.stats(),
        })),
        None => Err(api_error(StatusCode::NOT_FOUND, "no graph loaded")),
    }
}

/// POST /events - Replay a queries document against the served graph.
///
/// Mutations persist after the request returns.
#[utoipa::path(
    post,
    path = "/events",
    request_body(content = String, description = "queries.json document", content_type = "application/json"),
    responses(
        (status = 200, description = "One result record per event, in order"),
        (status = 400, description = "Malformed or invalid document", body = ErrorResponse),
        (status = 409, description = "No graph loaded", body = ErrorResponse)
    )
)]
async fn post_events(State(state): State<Arc<AppState>>, body: String) -> Result<Json<OutputDocument>, ApiError> {
    let doc = QueriesDocument::from_json_str(&body).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let mut loaded = state.loaded.write();
    let loaded = loaded
        .as_mut()
        .ok_or_else(|| api_error(StatusCode::CONFLICT, "no graph loaded"))?;

    let result = replay(&doc.events, &mut loaded.graph, true);
    info!(
        "Replayed {} events on '{}' in {:?}",
        result.summary.events, loaded.id, result.summary.elapsed
    );

    Ok(Json(OutputDocument {
        meta: doc.meta,
        results: result.results,
    }))
}

// ============================================================================
// Demo Data
// ============================================================================

/// GET /demo-data - List available demo datasets.
#[utoipa::path(
    get,
    path = "/demo-data",
    responses((status = 200, description = "List of demo dataset names", body = Vec<String>))
)]
async fn list_demo_data() -> Json<Vec<&'static str>> {
    Json(available_datasets().to_vec())
}

/// GET /demo-data/{name} - Get a demo graph document.
#[utoipa::path(
    get,
    path = "/demo-data/{name}",
    params(("name" = String, Path, description = "Demo dataset name")),
    responses(
        (status = 200, description = "Graph document"),
        (status = 404, description = "Dataset not found", body = ErrorResponse)
    )
)]
async fn get_demo_data(Path(name): Path<String>) -> Result<Json<GraphDocument>, ApiError> {
    generate_by_name(&name)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown dataset '{}'", name)))
}

/// PUT /demo-data/{name}/load - Serve a demo graph.
#[utoipa::path(
    put,
    path = "/demo-data/{name}/load",
    params(("name" = String, Path, description = "Demo dataset name")),
    responses(
        (status = 200, description = "Graph loaded", body = GraphResponse),
        (status = 404, description = "Dataset not found", body = ErrorResponse)
    )
)]
async fn load_demo_data(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<GraphResponse>, ApiError> {
    let doc = generate_by_name(&name)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown dataset '{}'", name)))?;
    Ok(Json(state.install(doc)))
}

// ============================================================================
// OpenAPI Documentation
// ============================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        info,
        load_graph,
        get_graph,
        post_events,
        list_demo_data,
        get_demo_data,
        load_demo_data,
    ),
    components(schemas(HealthResponse, InfoResponse, GraphResponse, GraphStats, ErrorResponse))
)]
struct ApiDoc;
