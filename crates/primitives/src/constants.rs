/// Path segment every log endpoint is served under, after the operator's url prefix.
pub const API_VERSION_PATH: &str = "tlog/v0";

/// Size in bytes of the fixed-width tree head signing input.
pub const TREE_HEAD_SIGNING_LEN: usize = 8 + 8 + 32;

/// Domain separation prefix for Merkle leaf hashes (RFC 6962).
pub const LEAF_HASH_PREFIX: u8 = 0x00;

/// Domain separation prefix for Merkle interior node hashes (RFC 6962).
pub const NODE_HASH_PREFIX: u8 = 0x01;

/// Private key used by tests and the sample configuration. Never use it for a real log.
pub const TEST_PRIVATE_KEY: &str =
    "1212121212121212121212121212121212121212121212121212121212121212";
