//! Checks applied to requests before they reach the state manager or the backend.

use tlog_primitives::crypto;
use tlog_primitives::types::Leaf;
use tlog_primitives::{ConsistencyProofRequest, InclusionProofRequest, LeafRequest, LeavesRequest};

use crate::error::LogError;

pub fn check_consistency_proof(request: &ConsistencyProofRequest) -> Result<(), LogError> {
    if request.old_size < 1 {
        return Err(LogError::BadRequest(
            "old_size must be at least 1".to_string(),
        ));
    }
    if request.new_size <= request.old_size {
        return Err(LogError::BadRequest(format!(
            "new_size {} must be larger than old_size {}",
            request.new_size, request.old_size
        )));
    }
    Ok(())
}

pub fn check_inclusion_proof(request: &InclusionProofRequest) -> Result<(), LogError> {
    // a tree of one leaf has an empty audit path
    if request.tree_size < 2 {
        return Err(LogError::BadRequest(
            "tree_size must be at least 2".to_string(),
        ));
    }
    Ok(())
}

/// Truncates the range to at most `max_range` leaves, keeping `start_size`.
pub fn check_leaves(request: &LeavesRequest, max_range: u64) -> Result<LeavesRequest, LogError> {
    if request.start_size > request.end_size {
        return Err(LogError::BadRequest(format!(
            "start_size {} is after end_size {}",
            request.start_size, request.end_size
        )));
    }
    if max_range == 0 {
        return Err(LogError::BadRequest("leaf retrieval is disabled".to_string()));
    }
    let end_size = request
        .end_size
        .min(request.start_size.saturating_add(max_range - 1));
    Ok(LeavesRequest {
        start_size: request.start_size,
        end_size,
    })
}

/// Verifies the submitter's signature over the checksum and builds the leaf to store.
pub fn check_leaf(request: &LeafRequest) -> Result<Leaf, LogError> {
    let key = crypto::verifying_key(&request.verification_key)
        .map_err(|e| LogError::BadRequest(e.to_string()))?;
    if !crypto::verify(&key, &request.checksum, &request.signature) {
        return Err(LogError::InvalidSignature);
    }
    Ok(Leaf {
        checksum: request.checksum,
        signature: request.signature,
        key_hash: crypto::key_hash(&request.verification_key),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use tlog_primitives::crypto::{Ed25519Signer, Signer};

    use super::*;

    #[test]
    fn consistency_proof_sizes() {
        let check = |old_size, new_size| {
            check_consistency_proof(&ConsistencyProofRequest { old_size, new_size })
        };
        assert!(matches!(check(0, 5), Err(LogError::BadRequest(_))));
        assert!(matches!(check(5, 5), Err(LogError::BadRequest(_))));
        assert!(matches!(check(6, 5), Err(LogError::BadRequest(_))));
        assert!(check(1, 2).is_ok());
    }

    #[test]
    fn inclusion_proof_needs_two_leaves() {
        let check = |tree_size| {
            check_inclusion_proof(&InclusionProofRequest {
                leaf_hash: [0; 32],
                tree_size,
            })
        };
        assert!(check(0).is_err());
        assert!(check(1).is_err());
        assert!(check(2).is_ok());
    }

    #[test]
    fn leaves_range_order() {
        let request = LeavesRequest {
            start_size: 4,
            end_size: 3,
        };
        assert!(matches!(
            check_leaves(&request, 10),
            Err(LogError::BadRequest(_))
        ));
    }

    proptest! {
        #[test]
        fn leaves_are_truncated_to_max_range(
            start_size in 0..u64::MAX / 2,
            span in 0..1000u64,
            max_range in 1..100u64,
        ) {
            let request = LeavesRequest { start_size, end_size: start_size + span };
            let checked = check_leaves(&request, max_range).unwrap();
            prop_assert_eq!(checked.start_size, start_size);
            prop_assert_eq!(checked.end_size - checked.start_size + 1, (span + 1).min(max_range));
        }
    }

    #[test]
    fn leaf_signature_covers_checksum() {
        let submitter = Ed25519Signer::from_bytes(&[5; 32]);
        let checksum = [0xcc; 32];
        let mut request = LeafRequest {
            checksum,
            signature: submitter.sign(&checksum).unwrap(),
            verification_key: submitter.public_key(),
        };

        let leaf = check_leaf(&request).unwrap();
        assert_eq!(leaf.key_hash, crypto::key_hash(&submitter.public_key()));
        assert_eq!(leaf.signature, request.signature);

        request.checksum[0] ^= 1;
        assert!(matches!(
            check_leaf(&request),
            Err(LogError::InvalidSignature)
        ));
    }
}
