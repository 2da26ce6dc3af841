//! Tree head state: the head open for cosigning and the last cosigned head.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tlog_backend::{with_deadline, BackendError, TreeBackend};
use tlog_primitives::crypto::{self, Signer};
use tlog_primitives::types::{KeyHash, RawSignature, SigIdent, SignedTreeHead};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::LogError;
use crate::witness::WitnessRegistry;

struct CosignState {
    to_sign: SignedTreeHead,
    cosigned: SignedTreeHead,
    /// Signatures collected for `to_sign` during the current round
    signatures: HashMap<KeyHash, SigIdent>,
}

/// Collects witness cosignatures for the log's tree heads.
///
/// Every `interval` the head that was open for signing becomes the cosigned head,
/// carrying all signatures gathered for it, and a freshly signed head from the
/// backend is opened for the next round. A head that does not change between
/// rounds keeps every signature it received in earlier rounds.
pub struct StateManager {
    backend: Arc<dyn TreeBackend>,
    signer: Arc<dyn Signer>,
    witnesses: WitnessRegistry,
    interval: Duration,
    deadline: Duration,
    state: RwLock<CosignState>,
}

impl StateManager {
    /// Fetches and signs the initial tree head, which becomes both the to-sign and
    /// the cosigned head.
    pub async fn new(
        backend: Arc<dyn TreeBackend>,
        signer: Arc<dyn Signer>,
        witnesses: WitnessRegistry,
        interval: Duration,
        deadline: Duration,
    ) -> Result<Self, LogError> {
        let initial = fetch_signed(backend.as_ref(), signer.as_ref(), deadline).await?;
        info!(
            tree_size = initial.tree_head.tree_size,
            witnesses = witnesses.len(),
            "Initialized tree head state"
        );
        Ok(Self::with_initial_head(
            backend, signer, witnesses, interval, deadline, initial,
        ))
    }

    fn with_initial_head(
        backend: Arc<dyn TreeBackend>,
        signer: Arc<dyn Signer>,
        witnesses: WitnessRegistry,
        interval: Duration,
        deadline: Duration,
        initial: SignedTreeHead,
    ) -> Self {
        let state = CosignState {
            signatures: round_signatures(&initial),
            to_sign: initial.clone(),
            cosigned: initial,
        };
        Self {
            backend,
            signer,
            witnesses,
            interval,
            deadline,
            state: RwLock::new(state),
        }
    }

    /// The backend's current tree head, signed by the log. Not stored.
    pub async fn latest(&self) -> Result<SignedTreeHead, LogError> {
        fetch_signed(self.backend.as_ref(), self.signer.as_ref(), self.deadline).await
    }

    /// The head witnesses should cosign, with every signature accepted for it this
    /// round, the log's included.
    pub fn to_sign(&self) -> SignedTreeHead {
        let state = self.state.read();
        SignedTreeHead {
            tree_head: state.to_sign.tree_head,
            signatures: state.signatures.values().copied().collect(),
        }
    }

    /// The most recent head with all collected cosignatures.
    pub fn cosigned(&self) -> SignedTreeHead {
        self.state.read().cosigned.clone()
    }

    /// Records a witness cosignature over the current to-sign head.
    #[instrument(level = "debug", skip_all, fields(witness = %self.witnesses.display_name(&key_hash)))]
    pub fn add_cosignature(
        &self,
        key_hash: KeyHash,
        signature: RawSignature,
    ) -> Result<(), LogError> {
        let key = self
            .witnesses
            .get(&key_hash)
            .ok_or_else(|| LogError::UnknownWitness(hex::encode(key_hash)))?;

        // The head must not rotate between verification and insertion.
        let state = self.state.upgradable_read();
        if !crypto::verify(key, &state.to_sign.tree_head.signing_bytes(), &signature) {
            return Err(LogError::InvalidSignature);
        }
        if state.signatures.contains_key(&key_hash) {
            return Err(LogError::DuplicateSignature(
                self.witnesses.display_name(&key_hash),
            ));
        }

        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        state.signatures.insert(
            key_hash,
            SigIdent {
                signature,
                key_hash,
            },
        );
        debug!(
            tree_size = state.to_sign.tree_head.tree_size,
            "Accepted cosignature"
        );
        Ok(())
    }

    /// Fetches the next head and rotates.
    pub async fn tick(&self) -> Result<(), LogError> {
        let next = self.latest().await?;
        self.rotate(next)
    }

    /// Closes the current round and opens `next` for cosigning.
    fn rotate(&self, next: SignedTreeHead) -> Result<(), LogError> {
        let mut state = self.state.write();
        let CosignState {
            to_sign,
            cosigned,
            signatures,
        } = &mut *state;

        if next.tree_head.tree_size < to_sign.tree_head.tree_size {
            return Err(BackendError::Malformed(format!(
                "tree size went back from {} to {}",
                to_sign.tree_head.tree_size, next.tree_head.tree_size
            ))
            .into());
        }

        if cosigned.tree_head == to_sign.tree_head {
            for sig in &cosigned.signatures {
                signatures.entry(sig.key_hash).or_insert(*sig);
            }
        }

        *cosigned = SignedTreeHead {
            tree_head: to_sign.tree_head,
            signatures: std::mem::take(signatures).into_values().collect(),
        };
        *signatures = round_signatures(&next);
        *to_sign = next;

        debug!(
            cosigned_size = cosigned.tree_head.tree_size,
            cosignatures = cosigned.signatures.len(),
            to_sign_size = to_sign.tree_head.tree_size,
            "Rotated tree heads"
        );
        Ok(())
    }

    /// Rotates every interval until cancelled. Failed ticks are logged and skipped.
    pub async fn run(&self, cancellation_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => {
                    info!("Stopping tree head rotation");
                    return;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!("Skipping tree head rotation: {}", e);
                    }
                }
            }
        }
    }
}

async fn fetch_signed(
    backend: &dyn TreeBackend,
    signer: &dyn Signer,
    deadline: Duration,
) -> Result<SignedTreeHead, LogError> {
    let tree_head = with_deadline(deadline, backend.get_tree_head()).await?;
    Ok(SignedTreeHead::sign(tree_head, signer)?)
}

fn round_signatures(sth: &SignedTreeHead) -> HashMap<KeyHash, SigIdent> {
    sth.signatures
        .iter()
        .map(|sig| (sig.key_hash, *sig))
        .collect()
}
