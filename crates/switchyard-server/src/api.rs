//! HTTP and WebSocket routes.
//!
//! The transport owns serialization only; graph and run semantics live in
//! `switchyard-engine`. Run-level failures are reported through the run
//! record (`status` + `error`), never as HTTP errors; only creation and
//! lookup problems map to status codes.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use switchyard_engine::{stream_run, Engine, DEFAULT_POLL_INTERVAL};
use switchyard_review::sample_review_graph;
use switchyard_types::{
    EdgeDef, NodeDef, RunLogEntry, RunStatus, State as StateMap, SwitchyardError,
};

/// Shared application state: one engine per process.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(err: SwitchyardError) -> ApiError {
    let status = err
        .http_status()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "detail": err.to_string() })))
}

pub fn router(engine: Engine) -> Router {
    Router::new()
        .route("/graph/create", post(create_graph))
        .route("/graph/run", post(run_graph))
        .route("/graph/run_async", post(run_graph_async))
        .route("/graph/state/{run_id}", get(get_run_state))
        .route("/graph/create_sample/code_review", post(create_sample_code_review))
        .route("/ws/run/{run_id}", get(ws_run_logs))
        .with_state(AppState { engine })
}

// ---------------------------------------------------------------------------
// API models
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GraphCreateRequest {
    pub nodes: Vec<NodeDef>,
    pub edges: Vec<EdgeDef>,
    pub start_node: String,
}

#[derive(Debug, Serialize)]
pub struct GraphCreateResponse {
    pub graph_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphRunRequest {
    pub graph_id: String,
    #[serde(default)]
    pub initial_state: StateMap,
}

#[derive(Debug, Serialize)]
pub struct GraphRunResponse {
    pub run_id: String,
    pub final_state: StateMap,
    pub status: RunStatus,
    pub log: Vec<RunLogEntry>,
}

/// Returned by `/graph/run_async` before the run has made any progress.
#[derive(Debug, Serialize)]
pub struct GraphRunStartResponse {
    pub run_id: String,
    pub status: RunStatus,
}

#[derive(Debug, Serialize)]
pub struct RunStateResponse {
    pub run_id: String,
    pub graph_id: String,
    pub status: RunStatus,
    pub current_node: Option<String>,
    pub state: StateMap,
    pub log: Vec<RunLogEntry>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /graph/create
async fn create_graph(
    State(state): State<AppState>,
    Json(req): Json<GraphCreateRequest>,
) -> Result<Json<GraphCreateResponse>, ApiError> {
    let graph = state
        .engine
        .create_graph(req.nodes, req.edges, req.start_node)
        .await
        .map_err(api_error)?;
    Ok(Json(GraphCreateResponse {
        graph_id: graph.id.clone(),
    }))
}

/// POST /graph/run — synchronous execution: waits for the whole workflow to
/// finish, then returns the final state and execution log.
async fn run_graph(
    State(state): State<AppState>,
    Json(req): Json<GraphRunRequest>,
) -> Result<Json<GraphRunResponse>, ApiError> {
    let run = state
        .engine
        .start_run(&req.graph_id, req.initial_state)
        .await
        .map_err(api_error)?;
    let done = state
        .engine
        .run_to_completion(&run.id)
        .await
        .map_err(api_error)?;

    Ok(Json(GraphRunResponse {
        run_id: done.id,
        final_state: done.state,
        status: done.status,
        log: done.log,
    }))
}

/// POST /graph/run_async — starts the workflow in a background task and
/// immediately returns the run id and PENDING status. Clients poll
/// `/graph/state/{run_id}` or subscribe to `/ws/run/{run_id}`.
async fn run_graph_async(
    State(state): State<AppState>,
    Json(req): Json<GraphRunRequest>,
) -> Result<Json<GraphRunStartResponse>, ApiError> {
    let run = state
        .engine
        .start_run(&req.graph_id, req.initial_state)
        .await
        .map_err(api_error)?;
    state.engine.spawn_run(&run.id).await.map_err(api_error)?;

    Ok(Json(GraphRunStartResponse {
        run_id: run.id,
        status: run.status,
    }))
}

/// GET /graph/state/{run_id}
async fn get_run_state(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunStateResponse>, ApiError> {
    let run = state.engine.get_run(&run_id).await.map_err(api_error)?;
    Ok(Json(RunStateResponse {
        run_id: run.id,
        graph_id: run.graph_id,
        status: run.status,
        current_node: run.current_node,
        state: run.state,
        log: run.log,
        error: run.error,
    }))
}

/// POST /graph/create_sample/code_review
async fn create_sample_code_review(
    State(state): State<AppState>,
) -> Result<Json<GraphCreateResponse>, ApiError> {
    let (nodes, edges, start) = sample_review_graph();
    let graph = state
        .engine
        .create_graph(nodes, edges, start)
        .await
        .map_err(api_error)?;
    Ok(Json(GraphCreateResponse {
        graph_id: graph.id.clone(),
    }))
}

// ---------------------------------------------------------------------------
// WebSocket: live log streaming
// ---------------------------------------------------------------------------

/// GET /ws/run/{run_id} — streams new log entries as they appear, then a
/// final `{status, done: true}` message once the run is terminal.
async fn ws_run_logs(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| forward_run_events(socket, state.engine, run_id))
}

async fn forward_run_events(mut socket: WebSocket, engine: Engine, run_id: String) {
    let mut rx = stream_run(engine.runs().clone(), run_id, DEFAULT_POLL_INTERVAL);

    while let Some(event) = rx.recv().await {
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize stream event");
                break;
            }
        };
        if socket.send(Message::Text(payload.into())).await.is_err() {
            // Client disconnected. Dropping the receiver tears down the poll
            // loop; the run itself is left alone.
            break;
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}
