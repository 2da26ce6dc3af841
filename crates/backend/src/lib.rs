//! The Merkle tree backend behind the log front-end.
//!
//! The front-end never stores leaves itself. It asks a [`TreeBackend`] for the current
//! tree head, proofs and leaf ranges, and forwards leaf submissions to it.

#![forbid(unsafe_code)]

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tlog_primitives::types::{AddLeafStatus, ConsistencyProof, InclusionProof, Leaf, TreeHead};
use tlog_primitives::{ConsistencyProofRequest, InclusionProofRequest, LeavesRequest};

mod client;
mod memory;
pub mod server;

pub use client::RpcBackend;
pub use memory::MemoryBackend;

pub const GET_TREE_HEAD_METHOD: &str = "backend_getTreeHead";
pub const ADD_LEAF_METHOD: &str = "backend_addLeaf";
pub const GET_CONSISTENCY_PROOF_METHOD: &str = "backend_getConsistencyProof";
pub const GET_INCLUSION_PROOF_METHOD: &str = "backend_getInclusionProof";
pub const GET_LEAVES_METHOD: &str = "backend_getLeaves";

/// Failure of a backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("malformed backend response: {0}")]
    Malformed(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
}

/// Storage and proof capability of a Merkle tree.
///
/// Requests are assumed to be validated by the caller; implementations still reject
/// sizes beyond the current tree with [`BackendError::OutOfRange`].
#[async_trait]
pub trait TreeBackend: Send + Sync + 'static {
    /// Current tree head. Unsigned.
    async fn get_tree_head(&self) -> Result<TreeHead, BackendError>;

    /// Queues a leaf for inclusion.
    async fn add_leaf(&self, leaf: &Leaf) -> Result<AddLeafStatus, BackendError>;

    async fn get_consistency_proof(
        &self,
        request: &ConsistencyProofRequest,
    ) -> Result<ConsistencyProof, BackendError>;

    async fn get_inclusion_proof(
        &self,
        request: &InclusionProofRequest,
    ) -> Result<InclusionProof, BackendError>;

    /// Leaves with indices `start_size..=end_size`.
    async fn get_leaves(&self, request: &LeavesRequest) -> Result<Vec<Leaf>, BackendError>;
}

/// Runs a backend call, giving up after `deadline`.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| BackendError::Timeout(deadline))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_expires() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BackendError>(1)
        };
        let result = with_deadline(Duration::from_secs(1), slow).await;
        assert_eq!(result, Err(BackendError::Timeout(Duration::from_secs(1))));
    }

    #[tokio::test]
    async fn deadline_passes_through_results() {
        let result = with_deadline(Duration::from_secs(1), async {
            Err::<u64, _>(BackendError::NotFound("leaf".to_string()))
        })
        .await;
        assert_eq!(result, Err(BackendError::NotFound("leaf".to_string())));
    }
}
