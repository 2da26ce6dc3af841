//! Hashing and Ed25519 helpers.

use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::types::{Hash, KeyHash, PublicKey, RawSignature};
use crate::{LEAF_HASH_PREFIX, NODE_HASH_PREFIX};

/// Failure of a [`Signer`].
#[derive(Debug, thiserror::Error)]
#[error("signer failed: {0}")]
pub struct SignError(pub String);

/// Failure to load key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid key encoding: {0}")]
    Encoding(#[from] hex::FromHexError),
    #[error("invalid key length: expected 32 bytes, got {0}")]
    Length(usize),
    #[error("invalid verification key: {0}")]
    Point(#[from] ed25519_dalek::SignatureError),
    /// The same key appears twice in a key set, by hex key hash.
    #[error("duplicate key {0}")]
    Duplicate(String),
}

/// Something that holds the log's private key.
///
/// Signing may fail for signers that are not in-process, e.g. remote or hardware backed keys.
pub trait Signer: Send + Sync + 'static {
    fn public_key(&self) -> PublicKey;

    fn sign(&self, message: &[u8]) -> Result<RawSignature, SignError>;
}

/// In-process Ed25519 signer.
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }

    /// Loads a 32-byte secret key from its hex encoding.
    pub fn from_hex(secret: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(secret.trim())?;
        let secret: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::Length(bytes.len()))?;
        Ok(Self::from_bytes(&secret))
    }
}

impl Signer for Ed25519Signer {
    fn public_key(&self) -> PublicKey {
        self.key.verifying_key().to_bytes()
    }

    fn sign(&self, message: &[u8]) -> Result<RawSignature, SignError> {
        Ok(self.key.sign(message).to_bytes())
    }
}

/// Parses a raw public key into a verification key.
pub fn verifying_key(public_key: &PublicKey) -> Result<VerifyingKey, KeyError> {
    Ok(VerifyingKey::from_bytes(public_key)?)
}

/// Parses a hex-encoded public key.
pub fn public_key_from_hex(public_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(public_key.trim())?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::Length(bytes.len()))
}

/// Strict Ed25519 verification. Rejects non-canonical encodings and small-order keys.
pub fn verify(key: &VerifyingKey, message: &[u8], signature: &RawSignature) -> bool {
    key.verify_strict(message, &Signature::from_bytes(signature))
        .is_ok()
}

pub fn key_hash(public_key: &PublicKey) -> KeyHash {
    Sha256::digest(public_key).into()
}

pub fn leaf_hash(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_HASH_PREFIX]);
    hasher.update(data);
    hasher.finalize().into()
}

pub fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_HASH_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Root hash of the empty tree.
pub fn empty_root() -> Hash {
    Sha256::digest(b"").into()
}
