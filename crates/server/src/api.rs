//! HTTP endpoints of the log, speaking the `key=value` wire format.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tlog_backend::{with_deadline, TreeBackend};
use tlog_common::rpc::{endpoint_path, get_cors_layer};
use tlog_primitives::ascii::{FromAscii, ToAscii};
use tlog_primitives::types::AddLeafStatus;
use tlog_primitives::{
    ConsistencyProofRequest, CosignatureRequest, InclusionProofRequest, LeafRequest,
    LeavesRequest, API_VERSION_PATH,
};
use tower_http::trace::TraceLayer;

use crate::error::LogError;
use crate::request;
use crate::state::StateManager;

/// Everything a handler needs.
#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<StateManager>,
    pub backend: Arc<dyn TreeBackend>,
    /// Max number of leaves per get-leaves response
    pub max_range: u64,
    /// Bound on each backend call
    pub deadline: Duration,
}

/// Builds the router, with every log endpoint under `<url_prefix>/tlog/v0/`.
pub fn router(context: ApiContext, url_prefix: &str) -> Router {
    let path = |endpoint| endpoint_path(url_prefix, API_VERSION_PATH, endpoint);

    Router::new()
        .route(&path("add-cosignature"), post(add_cosignature))
        .route(&path("get-tree-head-latest"), get(get_tree_head_latest))
        .route(&path("get-tree-head-to-sign"), get(get_tree_head_to_sign))
        .route(&path("get-tree-head-cosigned"), get(get_tree_head_cosigned))
        .route(&path("get-consistency-proof"), post(get_consistency_proof))
        .route(&path("get-proof-by-hash"), post(get_proof_by_hash))
        .route(&path("get-leaves"), post(get_leaves))
        .route(&path("add-leaf"), post(add_leaf))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(get_cors_layer())
        .with_state(context)
}

async fn health() -> &'static str {
    "ok"
}

async fn add_cosignature(
    State(ctx): State<ApiContext>,
    body: String,
) -> Result<StatusCode, LogError> {
    let request = CosignatureRequest::from_ascii(&body)?;
    ctx.state.add_cosignature(request.key_hash, request.signature)?;
    Ok(StatusCode::OK)
}

async fn get_tree_head_latest(State(ctx): State<ApiContext>) -> Result<String, LogError> {
    Ok(ctx.state.latest().await?.to_ascii())
}

async fn get_tree_head_to_sign(State(ctx): State<ApiContext>) -> String {
    ctx.state.to_sign().to_ascii()
}

async fn get_tree_head_cosigned(State(ctx): State<ApiContext>) -> String {
    ctx.state.cosigned().to_ascii()
}

async fn get_consistency_proof(
    State(ctx): State<ApiContext>,
    body: String,
) -> Result<String, LogError> {
    let request = ConsistencyProofRequest::from_ascii(&body)?;
    request::check_consistency_proof(&request)?;
    let proof = with_deadline(ctx.deadline, ctx.backend.get_consistency_proof(&request)).await?;
    Ok(proof.to_ascii())
}

async fn get_proof_by_hash(
    State(ctx): State<ApiContext>,
    body: String,
) -> Result<String, LogError> {
    let request = InclusionProofRequest::from_ascii(&body)?;
    request::check_inclusion_proof(&request)?;
    let proof = with_deadline(ctx.deadline, ctx.backend.get_inclusion_proof(&request)).await?;
    Ok(proof.to_ascii())
}

async fn get_leaves(State(ctx): State<ApiContext>, body: String) -> Result<String, LogError> {
    let request = LeavesRequest::from_ascii(&body)?;
    let request = request::check_leaves(&request, ctx.max_range)?;
    let leaves = with_deadline(ctx.deadline, ctx.backend.get_leaves(&request)).await?;
    Ok(leaves.to_ascii())
}

async fn add_leaf(State(ctx): State<ApiContext>, body: String) -> Result<StatusCode, LogError> {
    let request = LeafRequest::from_ascii(&body)?;
    let leaf = request::check_leaf(&request)?;
    let status = with_deadline(ctx.deadline, ctx.backend.add_leaf(&leaf)).await?;
    Ok(match status {
        AddLeafStatus::Accepted => StatusCode::ACCEPTED,
        AddLeafStatus::Sequenced => StatusCode::OK,
    })
}
