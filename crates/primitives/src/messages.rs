//! Request types and the wire encoding of every message the log API exchanges.

use serde::{Deserialize, Serialize};

use crate::ascii::{AsciiDecoder, AsciiEncoder, AsciiError, FromAscii, ToAscii};
use crate::types::{
    ConsistencyProof, Hash, HexHash, InclusionProof, KeyHash, Leaf, PublicKey, RawSignature,
    SigIdent, SignedTreeHead, TreeHead,
};

/// A witness cosignature for the current to-sign tree head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosignatureRequest {
    #[serde(with = "hex::serde")]
    pub signature: RawSignature,
    #[serde(with = "hex::serde")]
    pub key_hash: KeyHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyProofRequest {
    pub old_size: u64,
    pub new_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProofRequest {
    #[serde(with = "hex::serde")]
    pub leaf_hash: Hash,
    pub tree_size: u64,
}

/// Inclusive range of leaf indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeavesRequest {
    pub start_size: u64,
    pub end_size: u64,
}

/// A checksum submitted for logging, signed by the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafRequest {
    #[serde(with = "hex::serde")]
    pub checksum: Hash,
    #[serde(with = "hex::serde")]
    pub signature: RawSignature,
    #[serde(with = "hex::serde")]
    pub verification_key: PublicKey,
}

impl ToAscii for CosignatureRequest {
    fn to_ascii(&self) -> String {
        AsciiEncoder::new()
            .bytes("signature", &self.signature)
            .bytes("key_hash", &self.key_hash)
            .finish()
    }
}

impl FromAscii for CosignatureRequest {
    fn from_ascii(input: &str) -> Result<Self, AsciiError> {
        let decoder = AsciiDecoder::parse(input, &["signature", "key_hash"])?;
        Ok(Self {
            signature: decoder.bytes("signature")?,
            key_hash: decoder.bytes("key_hash")?,
        })
    }
}

impl ToAscii for ConsistencyProofRequest {
    fn to_ascii(&self) -> String {
        AsciiEncoder::new()
            .number("old_size", self.old_size)
            .number("new_size", self.new_size)
            .finish()
    }
}

impl FromAscii for ConsistencyProofRequest {
    fn from_ascii(input: &str) -> Result<Self, AsciiError> {
        let decoder = AsciiDecoder::parse(input, &["old_size", "new_size"])?;
        Ok(Self {
            old_size: decoder.number("old_size")?,
            new_size: decoder.number("new_size")?,
        })
    }
}

impl ToAscii for InclusionProofRequest {
    fn to_ascii(&self) -> String {
        AsciiEncoder::new()
            .bytes("leaf_hash", &self.leaf_hash)
            .number("tree_size", self.tree_size)
            .finish()
    }
}

impl FromAscii for InclusionProofRequest {
    fn from_ascii(input: &str) -> Result<Self, AsciiError> {
        let decoder = AsciiDecoder::parse(input, &["leaf_hash", "tree_size"])?;
        Ok(Self {
            leaf_hash: decoder.bytes("leaf_hash")?,
            tree_size: decoder.number("tree_size")?,
        })
    }
}

impl ToAscii for LeavesRequest {
    fn to_ascii(&self) -> String {
        AsciiEncoder::new()
            .number("start_size", self.start_size)
            .number("end_size", self.end_size)
            .finish()
    }
}

impl FromAscii for LeavesRequest {
    fn from_ascii(input: &str) -> Result<Self, AsciiError> {
        let decoder = AsciiDecoder::parse(input, &["start_size", "end_size"])?;
        Ok(Self {
            start_size: decoder.number("start_size")?,
            end_size: decoder.number("end_size")?,
        })
    }
}

impl ToAscii for LeafRequest {
    fn to_ascii(&self) -> String {
        AsciiEncoder::new()
            .bytes("checksum", &self.checksum)
            .bytes("signature", &self.signature)
            .bytes("verification_key", &self.verification_key)
            .finish()
    }
}

impl FromAscii for LeafRequest {
    fn from_ascii(input: &str) -> Result<Self, AsciiError> {
        let decoder =
            AsciiDecoder::parse(input, &["checksum", "signature", "verification_key"])?;
        Ok(Self {
            checksum: decoder.bytes("checksum")?,
            signature: decoder.bytes("signature")?,
            verification_key: decoder.bytes("verification_key")?,
        })
    }
}

impl ToAscii for SignedTreeHead {
    fn to_ascii(&self) -> String {
        let mut encoder = AsciiEncoder::new();
        encoder
            .number("timestamp", self.tree_head.timestamp)
            .number("tree_size", self.tree_head.tree_size)
            .bytes("root_hash", &self.tree_head.root_hash);
        for sig in &self.signatures {
            encoder
                .bytes("signature", &sig.signature)
                .bytes("key_hash", &sig.key_hash);
        }
        encoder.finish()
    }
}

impl FromAscii for SignedTreeHead {
    fn from_ascii(input: &str) -> Result<Self, AsciiError> {
        let decoder = AsciiDecoder::parse(
            input,
            &["timestamp", "tree_size", "root_hash", "signature", "key_hash"],
        )?;
        let signatures = decoder.bytes_list::<64>("signature")?;
        let key_hashes = decoder.bytes_list::<32>("key_hash")?;
        if signatures.len() != key_hashes.len() {
            return Err(AsciiError::UnpairedList("signature"));
        }
        if signatures.is_empty() {
            return Err(AsciiError::MissingKey("signature"));
        }
        Ok(Self {
            tree_head: TreeHead {
                timestamp: decoder.number("timestamp")?,
                tree_size: decoder.number("tree_size")?,
                root_hash: decoder.bytes("root_hash")?,
            },
            signatures: signatures
                .into_iter()
                .zip(key_hashes)
                .map(|(signature, key_hash)| SigIdent {
                    signature,
                    key_hash,
                })
                .collect(),
        })
    }
}

impl ToAscii for ConsistencyProof {
    fn to_ascii(&self) -> String {
        let mut encoder = AsciiEncoder::new();
        encoder
            .number("old_size", self.old_size)
            .number("new_size", self.new_size);
        for node in &self.path {
            encoder.bytes("consistency_path", &node.0);
        }
        encoder.finish()
    }
}

impl FromAscii for ConsistencyProof {
    fn from_ascii(input: &str) -> Result<Self, AsciiError> {
        let decoder = AsciiDecoder::parse(input, &["old_size", "new_size", "consistency_path"])?;
        Ok(Self {
            old_size: decoder.number("old_size")?,
            new_size: decoder.number("new_size")?,
            path: decoder
                .bytes_list::<32>("consistency_path")?
                .into_iter()
                .map(HexHash)
                .collect(),
        })
    }
}

impl ToAscii for InclusionProof {
    fn to_ascii(&self) -> String {
        let mut encoder = AsciiEncoder::new();
        encoder
            .number("tree_size", self.tree_size)
            .number("leaf_index", self.leaf_index);
        for node in &self.path {
            encoder.bytes("inclusion_path", &node.0);
        }
        encoder.finish()
    }
}

impl FromAscii for InclusionProof {
    fn from_ascii(input: &str) -> Result<Self, AsciiError> {
        let decoder = AsciiDecoder::parse(input, &["tree_size", "leaf_index", "inclusion_path"])?;
        Ok(Self {
            tree_size: decoder.number("tree_size")?,
            leaf_index: decoder.number("leaf_index")?,
            path: decoder
                .bytes_list::<32>("inclusion_path")?
                .into_iter()
                .map(HexHash)
                .collect(),
        })
    }
}

impl ToAscii for Vec<Leaf> {
    fn to_ascii(&self) -> String {
        let mut encoder = AsciiEncoder::new();
        for leaf in self {
            encoder
                .bytes("checksum", &leaf.checksum)
                .bytes("signature", &leaf.signature)
                .bytes("key_hash", &leaf.key_hash);
        }
        encoder.finish()
    }
}

impl FromAscii for Vec<Leaf> {
    fn from_ascii(input: &str) -> Result<Self, AsciiError> {
        let decoder = AsciiDecoder::parse(input, &["checksum", "signature", "key_hash"])?;
        let checksums = decoder.bytes_list::<32>("checksum")?;
        let signatures = decoder.bytes_list::<64>("signature")?;
        let key_hashes = decoder.bytes_list::<32>("key_hash")?;
        if checksums.len() != signatures.len() || checksums.len() != key_hashes.len() {
            return Err(AsciiError::UnpairedList("checksum"));
        }
        Ok(checksums
            .into_iter()
            .zip(signatures)
            .zip(key_hashes)
            .map(|((checksum, signature), key_hash)| Leaf {
                checksum,
                signature,
                key_hash,
            })
            .collect())
    }
}
