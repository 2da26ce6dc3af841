use async_trait::async_trait;
use jsonrpsee::core::client::{ClientT, Error};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use jsonrpsee::types::error::INVALID_PARAMS_CODE;
use tlog_primitives::types::{AddLeafStatus, ConsistencyProof, InclusionProof, Leaf, TreeHead};
use tlog_primitives::{ConsistencyProofRequest, InclusionProofRequest, LeavesRequest};
use tracing::instrument;

use crate::server::NOT_FOUND_CODE;
use crate::{
    BackendError, TreeBackend, ADD_LEAF_METHOD, GET_CONSISTENCY_PROOF_METHOD,
    GET_INCLUSION_PROOF_METHOD, GET_LEAVES_METHOD, GET_TREE_HEAD_METHOD,
};

/// A [`TreeBackend`] reached over JSON-RPC, see [`crate::server::rpc_module`].
#[derive(Debug, Clone)]
pub struct RpcBackend {
    /// Backend endpoint
    pub rpc_url: String,
    client: HttpClient,
}

impl RpcBackend {
    pub fn new(rpc_url: String) -> Result<Self, BackendError> {
        let client = HttpClientBuilder::default()
            .build(&rpc_url)
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        Ok(Self { rpc_url, client })
    }
}

fn from_client_error(e: Error) -> BackendError {
    match e {
        Error::Call(err) if err.code() == NOT_FOUND_CODE => {
            BackendError::NotFound(err.message().to_string())
        }
        Error::Call(err) if err.code() == INVALID_PARAMS_CODE => {
            BackendError::OutOfRange(err.message().to_string())
        }
        Error::ParseError(e) => BackendError::Malformed(e.to_string()),
        e => BackendError::Unavailable(e.to_string()),
    }
}

#[async_trait]
impl TreeBackend for RpcBackend {
    #[instrument(level = "trace", skip(self), err, ret)]
    async fn get_tree_head(&self) -> Result<TreeHead, BackendError> {
        self.client
            .request(GET_TREE_HEAD_METHOD, rpc_params![])
            .await
            .map_err(from_client_error)
    }

    #[instrument(level = "trace", skip_all, err, ret)]
    async fn add_leaf(&self, leaf: &Leaf) -> Result<AddLeafStatus, BackendError> {
        self.client
            .request(ADD_LEAF_METHOD, rpc_params![leaf])
            .await
            .map_err(from_client_error)
    }

    #[instrument(level = "trace", skip(self), err)]
    async fn get_consistency_proof(
        &self,
        request: &ConsistencyProofRequest,
    ) -> Result<ConsistencyProof, BackendError> {
        self.client
            .request(GET_CONSISTENCY_PROOF_METHOD, rpc_params![request])
            .await
            .map_err(from_client_error)
    }

    #[instrument(level = "trace", skip(self), err)]
    async fn get_inclusion_proof(
        &self,
        request: &InclusionProofRequest,
    ) -> Result<InclusionProof, BackendError> {
        self.client
            .request(GET_INCLUSION_PROOF_METHOD, rpc_params![request])
            .await
            .map_err(from_client_error)
    }

    #[instrument(level = "trace", skip(self), err)]
    async fn get_leaves(&self, request: &LeavesRequest) -> Result<Vec<Leaf>, BackendError> {
        self.client
            .request(GET_LEAVES_METHOD, rpc_params![request])
            .await
            .map_err(from_client_error)
    }
}
