//! Typed client for the log's `key=value` HTTP API.
#![forbid(unsafe_code)]

use reqwest::StatusCode;
use tlog_primitives::ascii::{AsciiError, FromAscii, ToAscii};
use tlog_primitives::crypto::{self, SignError, Signer};
use tlog_primitives::types::{
    AddLeafStatus, ConsistencyProof, InclusionProof, Leaf, SignedTreeHead,
};
use tlog_primitives::{
    ConsistencyProofRequest, CosignatureRequest, InclusionProofRequest, LeafRequest,
    LeavesRequest, API_VERSION_PATH,
};
use tracing::{debug, instrument};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The log answered with an `error=` body.
    #[error("log returned {status}: {message}")]
    Log { status: StatusCode, message: String },
    #[error("malformed response: {0}")]
    Malformed(#[from] AsciiError),
    #[error(transparent)]
    Sign(#[from] SignError),
}

/// Client for one log, addressed by its base url including any operator prefix,
/// e.g. `http://127.0.0.1:6280/logs/main`.
#[derive(Debug, Clone)]
pub struct LogClient {
    pub base_url: String,
    client: reqwest::Client,
}

impl LogClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder().build()?,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_VERSION_PATH, name)
    }

    async fn get(&self, name: &str) -> Result<String, ClientError> {
        let response = self.client.get(self.endpoint(name)).send().await?;
        let (_, body) = read_response(response).await?;
        Ok(body)
    }

    async fn post(&self, name: &str, body: String) -> Result<(StatusCode, String), ClientError> {
        let response = self
            .client
            .post(self.endpoint(name))
            .body(body)
            .send()
            .await?;
        read_response(response).await
    }

    #[instrument(level = "trace", skip(self), err)]
    pub async fn get_tree_head_latest(&self) -> Result<SignedTreeHead, ClientError> {
        Ok(SignedTreeHead::from_ascii(
            &self.get("get-tree-head-latest").await?,
        )?)
    }

    #[instrument(level = "trace", skip(self), err)]
    pub async fn get_tree_head_to_sign(&self) -> Result<SignedTreeHead, ClientError> {
        Ok(SignedTreeHead::from_ascii(
            &self.get("get-tree-head-to-sign").await?,
        )?)
    }

    #[instrument(level = "trace", skip(self), err)]
    pub async fn get_tree_head_cosigned(&self) -> Result<SignedTreeHead, ClientError> {
        Ok(SignedTreeHead::from_ascii(
            &self.get("get-tree-head-cosigned").await?,
        )?)
    }

    #[instrument(level = "trace", skip_all, err)]
    pub async fn add_cosignature(&self, request: &CosignatureRequest) -> Result<(), ClientError> {
        self.post("add-cosignature", request.to_ascii()).await?;
        Ok(())
    }

    /// Fetches the to-sign head, signs it with `witness` and submits the cosignature.
    ///
    /// Nothing is submitted if the head already carries a signature from `witness`.
    pub async fn cosign(&self, witness: &dyn Signer) -> Result<SignedTreeHead, ClientError> {
        let to_sign = self.get_tree_head_to_sign().await?;
        let key_hash = crypto::key_hash(&witness.public_key());
        if to_sign.signature_by(&key_hash).is_some() {
            debug!(tree_size = to_sign.tree_head.tree_size, "Already cosigned");
            return Ok(to_sign);
        }

        let request = CosignatureRequest {
            signature: witness.sign(&to_sign.tree_head.signing_bytes())?,
            key_hash,
        };
        self.add_cosignature(&request).await?;
        Ok(to_sign)
    }

    #[instrument(level = "trace", skip(self), err)]
    pub async fn get_consistency_proof(
        &self,
        request: &ConsistencyProofRequest,
    ) -> Result<ConsistencyProof, ClientError> {
        let (_, body) = self
            .post("get-consistency-proof", request.to_ascii())
            .await?;
        Ok(ConsistencyProof::from_ascii(&body)?)
    }

    #[instrument(level = "trace", skip(self), err)]
    pub async fn get_proof_by_hash(
        &self,
        request: &InclusionProofRequest,
    ) -> Result<InclusionProof, ClientError> {
        let (_, body) = self.post("get-proof-by-hash", request.to_ascii()).await?;
        Ok(InclusionProof::from_ascii(&body)?)
    }

    #[instrument(level = "trace", skip(self), err)]
    pub async fn get_leaves(&self, request: &LeavesRequest) -> Result<Vec<Leaf>, ClientError> {
        let (_, body) = self.post("get-leaves", request.to_ascii()).await?;
        Ok(Vec::<Leaf>::from_ascii(&body)?)
    }

    #[instrument(level = "trace", skip_all, err, ret)]
    pub async fn add_leaf(&self, request: &LeafRequest) -> Result<AddLeafStatus, ClientError> {
        let (status, _) = self.post("add-leaf", request.to_ascii()).await?;
        Ok(if status == StatusCode::ACCEPTED {
            AddLeafStatus::Accepted
        } else {
            AddLeafStatus::Sequenced
        })
    }
}

async fn read_response(response: reqwest::Response) -> Result<(StatusCode, String), ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let message = body
            .trim_end()
            .strip_prefix("error=")
            .unwrap_or(body.trim_end())
            .to_string();
        return Err(ClientError::Log { status, message });
    }
    Ok((status, body))
}
