//! A JSON-RPC server exposing any [`TreeBackend`].

use std::sync::Arc;

use jsonrpsee::types::error::{INTERNAL_ERROR_CODE, INVALID_PARAMS_CODE};
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::RpcModule;
use tlog_primitives::types::Leaf;
use tlog_primitives::{ConsistencyProofRequest, InclusionProofRequest, LeavesRequest};

use crate::{
    BackendError, TreeBackend, ADD_LEAF_METHOD, GET_CONSISTENCY_PROOF_METHOD,
    GET_INCLUSION_PROOF_METHOD, GET_LEAVES_METHOD, GET_TREE_HEAD_METHOD,
};

/// Error code for unknown leaves.
pub const NOT_FOUND_CODE: i32 = -32004;

fn to_rpc_error(e: BackendError) -> ErrorObjectOwned {
    let code = match e {
        BackendError::NotFound(_) => NOT_FOUND_CODE,
        BackendError::OutOfRange(_) => INVALID_PARAMS_CODE,
        _ => INTERNAL_ERROR_CODE,
    };
    let message = match e {
        BackendError::NotFound(msg) | BackendError::OutOfRange(msg) => msg,
        e => e.to_string(),
    };
    ErrorObjectOwned::owned(code, message, None::<()>)
}

/// Creates a new [`jsonrpsee::RpcModule`] serving every [`TreeBackend`] call.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tlog_backend::server::rpc_module;
/// use tlog_backend::MemoryBackend;
///
/// async fn rpc_server() -> jsonrpsee::server::ServerHandle {
///     let rpc_module = rpc_module(Arc::new(MemoryBackend::new())).unwrap();
///
///     let server = jsonrpsee::server::ServerBuilder::default()
///         .build("127.0.0.1:0")
///         .await
///         .unwrap();
///     server.start(rpc_module)
/// }
/// ```
pub fn rpc_module(
    backend: Arc<dyn TreeBackend>,
) -> anyhow::Result<RpcModule<Arc<dyn TreeBackend>>> {
    let mut rpc = RpcModule::new(backend);

    rpc.register_async_method(GET_TREE_HEAD_METHOD, |_, backend, _| async move {
        backend.get_tree_head().await.map_err(to_rpc_error)
    })?;
    rpc.register_async_method(ADD_LEAF_METHOD, |params, backend, _| async move {
        let leaf: Leaf = params.one()?;
        backend.add_leaf(&leaf).await.map_err(to_rpc_error)
    })?;
    rpc.register_async_method(
        GET_CONSISTENCY_PROOF_METHOD,
        |params, backend, _| async move {
            let request: ConsistencyProofRequest = params.one()?;
            backend
                .get_consistency_proof(&request)
                .await
                .map_err(to_rpc_error)
        },
    )?;
    rpc.register_async_method(
        GET_INCLUSION_PROOF_METHOD,
        |params, backend, _| async move {
            let request: InclusionProofRequest = params.one()?;
            backend
                .get_inclusion_proof(&request)
                .await
                .map_err(to_rpc_error)
        },
    )?;
    rpc.register_async_method(GET_LEAVES_METHOD, |params, backend, _| async move {
        let request: LeavesRequest = params.one()?;
        backend.get_leaves(&request).await.map_err(to_rpc_error)
    })?;

    Ok(rpc)
}
