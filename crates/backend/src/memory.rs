//! An in-process RFC 6962 Merkle tree.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tlog_primitives::crypto::{empty_root, node_hash};
use tlog_primitives::types::{
    AddLeafStatus, ConsistencyProof, Hash, InclusionProof, Leaf, TreeHead,
};
use tlog_primitives::{ConsistencyProofRequest, InclusionProofRequest, LeavesRequest};
use tracing::debug;

use crate::{BackendError, TreeBackend};

/// Keeps every leaf in memory. Leaves are sequenced as soon as they are added.
///
/// Meant for development and tests: nothing survives a restart.
#[derive(Default)]
pub struct MemoryBackend {
    tree: RwLock<MemoryTree>,
}

#[derive(Default)]
struct MemoryTree {
    leaves: Vec<Leaf>,
    hashes: Vec<Hash>,
    index: HashMap<Hash, u64>,
    head: Option<TreeHead>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree_size(&self) -> u64 {
        self.tree.read().hashes.len() as u64
    }
}

impl MemoryTree {
    fn head(&self) -> TreeHead {
        self.head.unwrap_or(TreeHead {
            timestamp: 0,
            tree_size: 0,
            root_hash: empty_root(),
        })
    }

    fn check_size(&self, size: u64) -> Result<usize, BackendError> {
        if size > self.hashes.len() as u64 {
            return Err(BackendError::OutOfRange(format!(
                "size {} exceeds tree size {}",
                size,
                self.hashes.len()
            )));
        }
        Ok(size as usize)
    }
}

#[async_trait]
impl TreeBackend for MemoryBackend {
    async fn get_tree_head(&self) -> Result<TreeHead, BackendError> {
        Ok(self.tree.read().head())
    }

    async fn add_leaf(&self, leaf: &Leaf) -> Result<AddLeafStatus, BackendError> {
        let leaf_hash = leaf.leaf_hash();
        let mut tree = self.tree.write();
        if tree.index.contains_key(&leaf_hash) {
            return Ok(AddLeafStatus::Sequenced);
        }

        let index = tree.hashes.len() as u64;
        tree.leaves.push(*leaf);
        tree.hashes.push(leaf_hash);
        tree.index.insert(leaf_hash, index);
        // The timestamp only moves when the tree grows, so an idle tree keeps
        // reporting an identical head.
        let head = TreeHead {
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
            tree_size: index + 1,
            root_hash: root(&tree.hashes),
        };
        tree.head = Some(head);
        debug!(tree_size = head.tree_size, "Sequenced leaf");

        Ok(AddLeafStatus::Accepted)
    }

    async fn get_consistency_proof(
        &self,
        request: &ConsistencyProofRequest,
    ) -> Result<ConsistencyProof, BackendError> {
        let tree = self.tree.read();
        let new_size = tree.check_size(request.new_size)?;
        if request.old_size == 0 || request.old_size >= request.new_size {
            return Err(BackendError::OutOfRange(format!(
                "no consistency proof from {} to {}",
                request.old_size, request.new_size
            )));
        }

        let path = subproof(request.old_size as usize, &tree.hashes[..new_size], true);
        Ok(ConsistencyProof {
            old_size: request.old_size,
            new_size: request.new_size,
            path: path.into_iter().map(Into::into).collect(),
        })
    }

    async fn get_inclusion_proof(
        &self,
        request: &InclusionProofRequest,
    ) -> Result<InclusionProof, BackendError> {
        let tree = self.tree.read();
        let tree_size = tree.check_size(request.tree_size)?;
        let leaf_index = match tree.index.get(&request.leaf_hash) {
            Some(index) if *index < request.tree_size => *index,
            _ => {
                return Err(BackendError::NotFound(format!(
                    "leaf {} in tree of size {}",
                    hex::encode(request.leaf_hash),
                    request.tree_size
                )))
            }
        };

        let path = audit_path(leaf_index as usize, &tree.hashes[..tree_size]);
        Ok(InclusionProof {
            tree_size: request.tree_size,
            leaf_index,
            path: path.into_iter().map(Into::into).collect(),
        })
    }

    async fn get_leaves(&self, request: &LeavesRequest) -> Result<Vec<Leaf>, BackendError> {
        let tree = self.tree.read();
        let size = tree.leaves.len() as u64;
        if request.start_size > request.end_size || request.end_size >= size {
            return Err(BackendError::OutOfRange(format!(
                "leaves {}..={} in tree of size {}",
                request.start_size, request.end_size, size
            )));
        }
        Ok(tree.leaves[request.start_size as usize..=request.end_size as usize].to_vec())
    }
}

/// Largest power of two strictly smaller than `n`, for `n >= 2`.
fn split_point(n: usize) -> usize {
    let mut k = 1;
    while k << 1 < n {
        k <<= 1;
    }
    k
}

/// MTH from RFC 6962 section 2.1.
fn root(hashes: &[Hash]) -> Hash {
    match hashes.len() {
        0 => empty_root(),
        1 => hashes[0],
        n => {
            let k = split_point(n);
            node_hash(&root(&hashes[..k]), &root(&hashes[k..]))
        }
    }
}

/// PATH from RFC 6962 section 2.1.1.
fn audit_path(m: usize, hashes: &[Hash]) -> Vec<Hash> {
    let n = hashes.len();
    if n <= 1 {
        return vec![];
    }
    let k = split_point(n);
    if m < k {
        let mut path = audit_path(m, &hashes[..k]);
        path.push(root(&hashes[k..]));
        path
    } else {
        let mut path = audit_path(m - k, &hashes[k..]);
        path.push(root(&hashes[..k]));
        path
    }
}

/// SUBPROOF from RFC 6962 section 2.1.2.
fn subproof(m: usize, hashes: &[Hash], complete: bool) -> Vec<Hash> {
    let n = hashes.len();
    if m == n {
        return if complete { vec![] } else { vec![root(hashes)] };
    }
    let k = split_point(n);
    if m <= k {
        let mut path = subproof(m, &hashes[..k], complete);
        path.push(root(&hashes[k..]));
        path
    } else {
        let mut path = subproof(m - k, &hashes[k..], false);
        path.push(root(&hashes[..k]));
        path
    }
}
