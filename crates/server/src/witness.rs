use std::collections::hash_map::Entry;
use std::collections::HashMap;

use ed25519_dalek::VerifyingKey;
use tlog_common::WitnessConfig;
use tlog_primitives::crypto::{self, KeyError};
use tlog_primitives::types::{KeyHash, PublicKey};

struct Witness {
    name: Option<String>,
    key: VerifyingKey,
}

/// The witnesses allowed to cosign, by key hash. Fixed at startup.
#[derive(Default)]
pub struct WitnessRegistry {
    witnesses: HashMap<KeyHash, Witness>,
}

impl WitnessRegistry {
    pub fn new(configs: &[WitnessConfig]) -> Result<Self, KeyError> {
        let mut registry = Self::default();
        for config in configs {
            let public_key = crypto::public_key_from_hex(&config.public_key)?;
            registry.insert(public_key, config.name.clone())?;
        }
        Ok(registry)
    }

    pub fn from_keys(keys: impl IntoIterator<Item = PublicKey>) -> Result<Self, KeyError> {
        let mut registry = Self::default();
        for public_key in keys {
            registry.insert(public_key, None)?;
        }
        Ok(registry)
    }

    fn insert(&mut self, public_key: PublicKey, name: Option<String>) -> Result<(), KeyError> {
        let key = crypto::verifying_key(&public_key)?;
        match self.witnesses.entry(crypto::key_hash(&public_key)) {
            Entry::Occupied(entry) => Err(KeyError::Duplicate(hex::encode(entry.key()))),
            Entry::Vacant(entry) => {
                entry.insert(Witness { name, key });
                Ok(())
            }
        }
    }

    pub fn get(&self, key_hash: &KeyHash) -> Option<&VerifyingKey> {
        self.witnesses.get(key_hash).map(|w| &w.key)
    }

    /// Configured name of a witness, or its hex key hash.
    pub fn display_name(&self, key_hash: &KeyHash) -> String {
        self.witnesses
            .get(key_hash)
            .and_then(|w| w.name.clone())
            .unwrap_or_else(|| hex::encode(key_hash))
    }

    pub fn len(&self) -> usize {
        self.witnesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.witnesses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tlog_primitives::crypto::{Ed25519Signer, Signer};

    use super::*;

    #[test]
    fn builds_from_config() {
        let public_key = Ed25519Signer::from_bytes(&[1; 32]).public_key();
        let registry = WitnessRegistry::new(&[WitnessConfig {
            name: Some("w1".to_string()),
            public_key: hex::encode(public_key),
        }])
        .unwrap();

        let key_hash = crypto::key_hash(&public_key);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&key_hash).unwrap().to_bytes(), public_key);
        assert_eq!(registry.display_name(&key_hash), "w1");
        assert!(registry.get(&[0; 32]).is_none());
    }

    #[test]
    fn rejects_bad_keys() {
        let result = WitnessRegistry::new(&[WitnessConfig {
            name: None,
            public_key: "not hex".to_string(),
        }]);
        assert!(matches!(result, Err(KeyError::Encoding(_))));

        let result = WitnessRegistry::new(&[WitnessConfig {
            name: None,
            public_key: hex::encode([1u8; 16]),
        }]);
        assert!(matches!(result, Err(KeyError::Length(16))));
    }

    #[test]
    fn rejects_key_configured_twice() {
        let public_key = hex::encode(Ed25519Signer::from_bytes(&[1; 32]).public_key());
        let result = WitnessRegistry::new(&[
            WitnessConfig {
                name: Some("w1".to_string()),
                public_key: public_key.clone(),
            },
            WitnessConfig {
                name: Some("w1-again".to_string()),
                public_key,
            },
        ]);
        assert!(matches!(result, Err(KeyError::Duplicate(_))));
    }
}
