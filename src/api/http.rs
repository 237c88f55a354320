//! HTTP API Server
//!
//! REST API for reads, leader writes, follower replication and quorum
//! reconfiguration.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Role;
use crate::error::{Error, Result};
use crate::replication::{FollowerNode, LeaderNode, ReplicationAck, ReplicationRequest, WriteOutcome, WriteStatus};
use crate::state::{QuorumInfo, QuorumUpdate};
use crate::store::KvStore;

/// Shared state for routes served by both roles
pub struct AppState {
    pub node_id: String,
    pub role: Role,
    pub store: Arc<KvStore>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Present on the leader only
    pub leader: Option<Arc<LeaderNode>>,
}

/// HTTP API server
pub struct HttpServer {
    bind_address: String,
    state: Arc<AppState>,
    follower: Option<Arc<FollowerNode>>,
}

impl HttpServer {
    /// Serve the leader API
    pub fn leader(bind_address: String, leader: Arc<LeaderNode>) -> Self {
        let state = Arc::new(AppState {
            node_id: leader.node_id().to_string(),
            role: Role::Leader,
            store: Arc::clone(leader.store()),
            started_at: chrono::Utc::now(),
            leader: Some(leader),
        });

        Self { bind_address, state, follower: None }
    }

    /// Serve the follower API
    pub fn follower(bind_address: String, follower: Arc<FollowerNode>) -> Self {
        let state = Arc::new(AppState {
            node_id: follower.node_id().to_string(),
            role: Role::Follower,
            store: Arc::clone(follower.store()),
            started_at: chrono::Utc::now(),
            leader: None,
        });

        Self { bind_address, state, follower: Some(follower) }
    }

    /// Create the router
    pub fn router(&self) -> Router {
        let common = Router::new()
            .route("/", get(handle_root))
            .route("/health", get(handle_health))
            .route("/keys", get(handle_list_keys))
            .route("/keys/:key", get(handle_read))
            .route("/state", get(handle_state))
            .with_state(Arc::clone(&self.state));

        let role_routes = match (&self.state.leader, &self.follower) {
            (Some(leader), _) => Router::new()
                .route("/keys", post(handle_write))
                .route("/config/quorum", get(handle_get_quorum).post(handle_set_quorum))
                .with_state(Arc::clone(leader)),
            (None, Some(follower)) => Router::new()
                .route("/replicate", post(handle_replicate))
                .with_state(Arc::clone(follower)),
            (None, None) => Router::new(),
        };

        common
            .merge(role_routes)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// Bind the configured address and serve until the listener fails
    pub async fn start(&self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;
        tracing::info!(
            "{} {} HTTP API listening on {}",
            self.state.role,
            self.state.node_id,
            self.bind_address
        );
        self.serve(listener).await
    }

    /// Serve on an already-bound listener
    pub async fn serve(&self, listener: tokio::net::TcpListener) -> Result<()> {
        axum::serve(listener, self.router())
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))
    }
}

// ============ Request/Response Types ============

/// Client write request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRequest {
    pub key: String,
    pub value: String,
}

/// Quorum reconfiguration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumUpdateRequest {
    pub quorum: usize,
}

/// Write response (also embedded in the quorum shortfall body)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteResponse {
    pub status: WriteStatus,
    pub key: String,
    pub value: String,
    pub replicated_to: usize,
    pub total_followers: usize,
    pub write_quorum: usize,
    pub latency_seconds: f64,
}

impl From<&WriteOutcome> for WriteResponse {
    fn from(outcome: &WriteOutcome) -> Self {
        Self {
            status: outcome.status,
            key: outcome.key.clone(),
            value: outcome.value.clone(),
            replicated_to: outcome.acked,
            total_followers: outcome.total_followers,
            write_quorum: outcome.quorum,
            latency_seconds: outcome.latency.as_secs_f64(),
        }
    }
}

/// 503 body for a write that missed its quorum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumShortfallResponse {
    pub error: String,
    pub code: String,
    #[serde(flatten)]
    pub outcome: WriteResponse,
}

/// Quorum update response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumUpdateResponse {
    pub status: String,
    #[serde(flatten)]
    pub update: QuorumUpdate,
}

/// Single key read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValueResponse {
    pub key: String,
    pub value: String,
}

/// Key listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
}

/// Full store snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub node_id: String,
    pub store: HashMap<String, String>,
    pub keys_count: usize,
}

/// Node description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub role: Role,
    pub node_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_quorum: Option<usize>,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub role: Role,
    pub node_id: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Maps crate errors onto HTTP responses
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.0;
        let status = match &error {
            Error::KeyNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidQuorum { .. } => StatusCode::BAD_REQUEST,
            Error::QuorumNotMet(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", error);
        }

        if let Error::QuorumNotMet(outcome) = &error {
            return (
                status,
                Json(QuorumShortfallResponse {
                    error: error.to_string(),
                    code: error.code().to_string(),
                    outcome: WriteResponse::from(outcome.as_ref()),
                }),
            )
                .into_response();
        }

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                code: error.code().to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ============ Common Handlers ============

async fn handle_root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let leader = state.leader.as_ref();
    Json(RootResponse {
        role: state.role,
        node_id: state.node_id.clone(),
        started_at: state.started_at,
        followers: leader.map(|l| l.followers().to_vec()),
        write_quorum: leader.map(|l| l.get_quorum().quorum),
    })
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        role: state.role,
        node_id: state.node_id.clone(),
    })
}

async fn handle_read(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<KeyValueResponse> {
    let value = state.store.get(&key)?;
    Ok(Json(KeyValueResponse { key, value }))
}

async fn handle_list_keys(State(state): State<Arc<AppState>>) -> ApiResult<KeysResponse> {
    Ok(Json(KeysResponse {
        keys: state.store.keys()?,
    }))
}

async fn handle_state(State(state): State<Arc<AppState>>) -> ApiResult<StateResponse> {
    let store = state.store.snapshot()?;
    Ok(Json(StateResponse {
        node_id: state.node_id.clone(),
        keys_count: store.len(),
        store,
    }))
}

// ============ Leader Handlers ============

async fn handle_write(
    State(leader): State<Arc<LeaderNode>>,
    Json(req): Json<WriteRequest>,
) -> ApiResult<WriteResponse> {
    let outcome = leader.write(req.key, req.value).await?;
    Ok(Json(WriteResponse::from(&outcome)))
}

async fn handle_get_quorum(State(leader): State<Arc<LeaderNode>>) -> Json<QuorumInfo> {
    Json(leader.get_quorum())
}

async fn handle_set_quorum(
    State(leader): State<Arc<LeaderNode>>,
    Json(req): Json<QuorumUpdateRequest>,
) -> ApiResult<QuorumUpdateResponse> {
    let update = leader.set_quorum(req.quorum)?;
    Ok(Json(QuorumUpdateResponse {
        status: "updated".to_string(),
        update,
    }))
}

// ============ Follower Handlers ============

async fn handle_replicate(
    State(follower): State<Arc<FollowerNode>>,
    Json(req): Json<ReplicationRequest>,
) -> ApiResult<ReplicationAck> {
    // Detached so the write still lands if the leader stops waiting
    let task = tokio::spawn(async move { follower.replicate(req).await });
    task.await
        .map_err(|e| Error::Internal(format!("replication task failed: {}", e)))??;
    Ok(Json(ReplicationAck::replicated()))
}
