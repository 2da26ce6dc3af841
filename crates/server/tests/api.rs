use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tlog_backend::{BackendError, MemoryBackend, TreeBackend};
use tlog_primitives::ascii::{FromAscii, ToAscii};
use tlog_primitives::crypto::{self, Ed25519Signer, Signer};
use tlog_primitives::types::{
    AddLeafStatus, ConsistencyProof, InclusionProof, Leaf, SignedTreeHead, TreeHead,
};
use tlog_primitives::{
    ConsistencyProofRequest, CosignatureRequest, InclusionProofRequest, LeafRequest,
    LeavesRequest, TEST_PRIVATE_KEY,
};
use tlog_server::api::{router, ApiContext};
use tlog_server::{StateManager, WitnessRegistry};
use tower::ServiceExt;

/// Memory backend that counts the calls it serves.
#[derive(Default)]
struct CountingBackend {
    inner: MemoryBackend,
    calls: AtomicUsize,
}

#[async_trait]
impl TreeBackend for CountingBackend {
    async fn get_tree_head(&self) -> Result<TreeHead, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_tree_head().await
    }

    async fn add_leaf(&self, leaf: &Leaf) -> Result<AddLeafStatus, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.add_leaf(leaf).await
    }

    async fn get_consistency_proof(
        &self,
        request: &ConsistencyProofRequest,
    ) -> Result<ConsistencyProof, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_consistency_proof(request).await
    }

    async fn get_inclusion_proof(
        &self,
        request: &InclusionProofRequest,
    ) -> Result<InclusionProof, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_inclusion_proof(request).await
    }

    async fn get_leaves(&self, request: &LeavesRequest) -> Result<Vec<Leaf>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_leaves(request).await
    }
}

struct TestLog {
    app: Router,
    state: Arc<StateManager>,
    backend: Arc<CountingBackend>,
}

const PREFIX: &str = "/logs/test/tlog/v0";

async fn test_log(witnesses: &[&Ed25519Signer], max_range: u64) -> TestLog {
    let backend = Arc::new(CountingBackend::default());
    let state = Arc::new(
        StateManager::new(
            backend.clone(),
            Arc::new(Ed25519Signer::from_hex(TEST_PRIVATE_KEY).unwrap()),
            WitnessRegistry::from_keys(witnesses.iter().map(|w| w.public_key())).unwrap(),
            Duration::from_secs(30),
            Duration::from_secs(1),
        )
        .await
        .unwrap(),
    );
    let app = router(
        ApiContext {
            state: state.clone(),
            backend: backend.clone(),
            max_range,
            deadline: Duration::from_secs(1),
        },
        "logs/test/",
    );
    TestLog {
        app,
        state,
        backend,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: String) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(app: &Router, endpoint: &str) -> (StatusCode, String) {
    call(app, "GET", &format!("{PREFIX}/{endpoint}"), String::new()).await
}

async fn post(app: &Router, endpoint: &str, body: String) -> (StatusCode, String) {
    call(app, "POST", &format!("{PREFIX}/{endpoint}"), body).await
}

fn leaf_request(submitter: &Ed25519Signer, n: u8) -> LeafRequest {
    let checksum = [n; 32];
    LeafRequest {
        checksum,
        signature: submitter.sign(&checksum).unwrap(),
        verification_key: submitter.public_key(),
    }
}

async fn add_leaves(app: &Router, count: u8) {
    let submitter = Ed25519Signer::from_bytes(&[42; 32]);
    for n in 0..count {
        let (status, _) = post(app, "add-leaf", leaf_request(&submitter, n).to_ascii()).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }
}

#[tokio::test]
async fn health_is_outside_the_prefix() {
    let log = test_log(&[], 10).await;
    let (status, body) = call(&log.app, "GET", "/health", String::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = call(
        &log.app,
        "GET",
        "/tlog/v0/get-tree-head-to-sign",
        String::new(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn serves_signed_tree_heads() {
    let log = test_log(&[], 10).await;
    let log_key = Ed25519Signer::from_hex(TEST_PRIVATE_KEY)
        .unwrap()
        .public_key();

    for endpoint in [
        "get-tree-head-to-sign",
        "get-tree-head-cosigned",
        "get-tree-head-latest",
    ] {
        let (status, body) = get(&log.app, endpoint).await;
        assert_eq!(status, StatusCode::OK, "{endpoint}");
        let sth = SignedTreeHead::from_ascii(&body).unwrap();
        assert_eq!(sth.tree_head.tree_size, 0);
        assert_eq!(sth.signatures.len(), 1);
        assert_eq!(sth.signatures[0].key_hash, crypto::key_hash(&log_key));
    }
}

#[tokio::test]
async fn cosignature_flow() {
    let witness = Ed25519Signer::from_bytes(&[1; 32]);
    let log = test_log(&[&witness], 10).await;

    let (_, body) = get(&log.app, "get-tree-head-to-sign").await;
    let to_sign = SignedTreeHead::from_ascii(&body).unwrap();
    let request = CosignatureRequest {
        signature: witness.sign(&to_sign.tree_head.signing_bytes()).unwrap(),
        key_hash: crypto::key_hash(&witness.public_key()),
    };

    let (status, body) = post(&log.app, "add-cosignature", request.to_ascii()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");

    let (_, body) = get(&log.app, "get-tree-head-to-sign").await;
    let to_sign = SignedTreeHead::from_ascii(&body).unwrap();
    assert_eq!(to_sign.signatures.len(), 2);
    assert!(to_sign.signature_by(&request.key_hash).is_some());

    let (status, body) = post(&log.app, "add-cosignature", request.to_ascii()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("error=duplicate cosignature"), "{body}");

    log.state.tick().await.unwrap();
    let (_, body) = get(&log.app, "get-tree-head-cosigned").await;
    let cosigned = SignedTreeHead::from_ascii(&body).unwrap();
    assert_eq!(cosigned.signatures.len(), 2);
    assert!(cosigned.signature_by(&request.key_hash).is_some());
}

#[tokio::test]
async fn cosignature_errors() {
    let witness = Ed25519Signer::from_bytes(&[1; 32]);
    let stranger = Ed25519Signer::from_bytes(&[2; 32]);
    let log = test_log(&[&witness], 10).await;
    let tree_head = log.state.to_sign().tree_head;

    let unknown = CosignatureRequest {
        signature: stranger.sign(&tree_head.signing_bytes()).unwrap(),
        key_hash: crypto::key_hash(&stranger.public_key()),
    };
    let (status, body) = post(&log.app, "add-cosignature", unknown.to_ascii()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("error=unknown witness"), "{body}");

    let forged = CosignatureRequest {
        signature: stranger.sign(&tree_head.signing_bytes()).unwrap(),
        key_hash: crypto::key_hash(&witness.public_key()),
    };
    let (status, body) = post(&log.app, "add-cosignature", forged.to_ascii()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "error=invalid signature\n");

    let extra = format!("{}tree_size=0\n", forged.to_ascii());
    let (status, body) = post(&log.app, "add-cosignature", extra).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("error=bad request"), "{body}");
}

#[tokio::test]
async fn consistency_proof_from_empty_tree_is_rejected_locally() {
    let log = test_log(&[], 10).await;
    let calls = log.backend.calls.load(Ordering::SeqCst);

    let request = ConsistencyProofRequest {
        old_size: 0,
        new_size: 5,
    };
    let (status, body) = post(&log.app, "get-consistency-proof", request.to_ascii()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("error="));
    assert_eq!(log.backend.calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn consistency_and_inclusion_proofs() {
    let log = test_log(&[], 10).await;
    add_leaves(&log.app, 5).await;

    let request = ConsistencyProofRequest {
        old_size: 2,
        new_size: 5,
    };
    let (status, body) = post(&log.app, "get-consistency-proof", request.to_ascii()).await;
    assert_eq!(status, StatusCode::OK);
    let proof = ConsistencyProof::from_ascii(&body).unwrap();
    assert_eq!((proof.old_size, proof.new_size), (2, 5));
    assert!(!proof.path.is_empty());

    let submitter = Ed25519Signer::from_bytes(&[42; 32]);
    let leaf = Leaf {
        checksum: [3; 32],
        signature: submitter.sign(&[3; 32]).unwrap(),
        key_hash: crypto::key_hash(&submitter.public_key()),
    };
    let request = InclusionProofRequest {
        leaf_hash: leaf.leaf_hash(),
        tree_size: 5,
    };
    let (status, body) = post(&log.app, "get-proof-by-hash", request.to_ascii()).await;
    assert_eq!(status, StatusCode::OK);
    let proof = InclusionProof::from_ascii(&body).unwrap();
    assert_eq!(proof.leaf_index, 3);
    assert_eq!(proof.path.len(), 3);

    let missing = InclusionProofRequest {
        leaf_hash: [0; 32],
        tree_size: 5,
    };
    let (status, _) = post(&log.app, "get-proof-by-hash", missing.to_ascii()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let too_small = InclusionProofRequest {
        leaf_hash: leaf.leaf_hash(),
        tree_size: 1,
    };
    let (status, _) = post(&log.app, "get-proof-by-hash", too_small.to_ascii()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn leaves_are_truncated_to_max_range() {
    let log = test_log(&[], 3).await;
    add_leaves(&log.app, 6).await;

    let request = LeavesRequest {
        start_size: 1,
        end_size: 5,
    };
    let (status, body) = post(&log.app, "get-leaves", request.to_ascii()).await;
    assert_eq!(status, StatusCode::OK);
    let leaves = Vec::<Leaf>::from_ascii(&body).unwrap();
    assert_eq!(leaves.len(), 3);
    assert_eq!(leaves[0].checksum, [1; 32]);
    assert_eq!(leaves[2].checksum, [3; 32]);

    let request = LeavesRequest {
        start_size: 4,
        end_size: 5,
    };
    let (_, body) = post(&log.app, "get-leaves", request.to_ascii()).await;
    assert_eq!(Vec::<Leaf>::from_ascii(&body).unwrap().len(), 2);

    let beyond = LeavesRequest {
        start_size: 6,
        end_size: 7,
    };
    let (status, _) = post(&log.app, "get-leaves", beyond.to_ascii()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn add_leaf_statuses() {
    let log = test_log(&[], 10).await;
    let submitter = Ed25519Signer::from_bytes(&[42; 32]);
    let request = leaf_request(&submitter, 7);

    let (status, _) = post(&log.app, "add-leaf", request.to_ascii()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = post(&log.app, "add-leaf", request.to_ascii()).await;
    assert_eq!(status, StatusCode::OK);

    let mut forged = request;
    forged.checksum = [8; 32];
    let (status, body) = post(&log.app, "add-leaf", forged.to_ascii()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "error=invalid signature\n");

    // the new leaf shows up in the next latest head
    let (_, body) = get(&log.app, "get-tree-head-latest").await;
    assert_eq!(SignedTreeHead::from_ascii(&body).unwrap().tree_head.tree_size, 1);
}
