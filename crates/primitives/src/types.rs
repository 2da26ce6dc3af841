use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::TREE_HEAD_SIGNING_LEN;

/// A SHA-256 digest: Merkle roots, leaf hashes and proof path nodes.
pub type Hash = [u8; 32];

/// SHA-256 digest of an Ed25519 verification key.
pub type KeyHash = [u8; 32];

/// Raw Ed25519 verification key.
pub type PublicKey = [u8; 32];

/// Raw Ed25519 signature.
pub type RawSignature = [u8; 64];

/// Commitment to the state of the log, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeHead {
    /// Seconds since the unix epoch at which the backend produced this head
    pub timestamp: u64,
    /// Number of leaves in the tree
    pub tree_size: u64,
    /// RFC 6962 root hash of the tree
    #[serde(with = "hex::serde")]
    pub root_hash: Hash,
}

impl TreeHead {
    /// The message signed by the log and by witnesses.
    ///
    /// Big-endian `timestamp || tree_size || root_hash`, always 48 bytes.
    pub fn signing_bytes(&self) -> [u8; TREE_HEAD_SIGNING_LEN] {
        let mut out = [0u8; TREE_HEAD_SIGNING_LEN];
        out[..8].copy_from_slice(&self.timestamp.to_be_bytes());
        out[8..16].copy_from_slice(&self.tree_size.to_be_bytes());
        out[16..].copy_from_slice(&self.root_hash);
        out
    }
}

/// A signature together with the hash of the key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigIdent {
    #[serde(with = "hex::serde")]
    pub signature: RawSignature,
    #[serde(with = "hex::serde")]
    pub key_hash: KeyHash,
}

/// A tree head and the signatures collected for it.
///
/// Built through [`SignedTreeHead::sign`], so the log's own signature is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTreeHead {
    pub tree_head: TreeHead,
    pub signatures: Vec<SigIdent>,
}

impl SignedTreeHead {
    /// Signs `tree_head` with the log key.
    pub fn sign(
        tree_head: TreeHead,
        signer: &dyn crypto::Signer,
    ) -> Result<Self, crypto::SignError> {
        let signature = signer.sign(&tree_head.signing_bytes())?;
        Ok(Self {
            tree_head,
            signatures: vec![SigIdent {
                signature,
                key_hash: crypto::key_hash(&signer.public_key()),
            }],
        })
    }

    /// Returns the signature made by the key with hash `key_hash`, if any.
    pub fn signature_by(&self, key_hash: &KeyHash) -> Option<&SigIdent> {
        self.signatures.iter().find(|s| &s.key_hash == key_hash)
    }
}

/// A logged entry: a checksum signed by its submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaf {
    #[serde(with = "hex::serde")]
    pub checksum: Hash,
    #[serde(with = "hex::serde")]
    pub signature: RawSignature,
    #[serde(with = "hex::serde")]
    pub key_hash: KeyHash,
}

impl Leaf {
    /// Serialized leaf as hashed into the Merkle tree.
    pub fn to_bytes(&self) -> [u8; 128] {
        let mut out = [0u8; 128];
        out[..32].copy_from_slice(&self.checksum);
        out[32..96].copy_from_slice(&self.signature);
        out[96..].copy_from_slice(&self.key_hash);
        out
    }

    pub fn leaf_hash(&self) -> Hash {
        crypto::leaf_hash(&self.to_bytes())
    }
}

/// Proof that the tree of size `old_size` is a prefix of the tree of size `new_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyProof {
    pub old_size: u64,
    pub new_size: u64,
    pub path: Vec<HexHash>,
}

/// Audit path for the leaf at `leaf_index` in the tree of size `tree_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    pub tree_size: u64,
    pub leaf_index: u64,
    pub path: Vec<HexHash>,
}

/// A hash that serializes as a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexHash(#[serde(with = "hex::serde")] pub Hash);

impl From<Hash> for HexHash {
    fn from(hash: Hash) -> Self {
        Self(hash)
    }
}

/// Outcome of submitting a leaf to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddLeafStatus {
    /// The leaf is new and queued for inclusion.
    Accepted,
    /// An identical leaf is already part of the tree.
    Sequenced,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_bytes_are_fixed_width_big_endian() {
        let tree_head = TreeHead {
            timestamp: 0x0102030405060708,
            tree_size: 5,
            root_hash: [0xab; 32],
        };
        let bytes = tree_head.signing_bytes();

        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[8..16], &[0, 0, 0, 0, 0, 0, 0, 5]);
        assert_eq!(&bytes[16..], &[0xab; 32]);
    }

    #[test]
    fn leaf_bytes_layout() {
        let leaf = Leaf {
            checksum: [1; 32],
            signature: [2; 64],
            key_hash: [3; 32],
        };
        let bytes = leaf.to_bytes();
        assert!(bytes[..32].iter().all(|b| *b == 1));
        assert!(bytes[32..96].iter().all(|b| *b == 2));
        assert!(bytes[96..].iter().all(|b| *b == 3));
    }
}
