use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use backoff::future::retry as retry_backoff;
use backoff::ExponentialBackoffBuilder;
use tlog_backend::{with_deadline, MemoryBackend, RpcBackend, TreeBackend};
use tlog_common::tasks::manager::TaskManager;
use tlog_common::{BackendConfig, LogNodeConfig};
use tlog_primitives::crypto::{self, Ed25519Signer, Signer};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::api::{self, ApiContext};
use crate::state::StateManager;
use crate::witness::WitnessRegistry;

/// A running log front-end: the rotation loop and the HTTP API.
pub struct LogNode {
    config: LogNodeConfig,
    state: Arc<StateManager>,
    backend: Arc<dyn TreeBackend>,
    task_manager: TaskManager<()>,
}

impl LogNode {
    /// Connects to the configured backend and builds the initial tree head state.
    pub async fn new(config: LogNodeConfig) -> anyhow::Result<Self> {
        let backend: Arc<dyn TreeBackend> = match &config.backend {
            BackendConfig::Memory => {
                warn!("Using the in-memory backend, leaves are lost on restart");
                Arc::new(MemoryBackend::new())
            }
            BackendConfig::Rpc { url } => Arc::new(RpcBackend::new(url.clone())?),
        };
        Self::with_backend(config, backend).await
    }

    pub async fn with_backend(
        config: LogNodeConfig,
        backend: Arc<dyn TreeBackend>,
    ) -> anyhow::Result<Self> {
        let signer = Arc::new(
            Ed25519Signer::from_hex(&config.log.private_key)
                .context("Failed to load log private key")?,
        );
        let witnesses =
            WitnessRegistry::new(&config.witnesses).context("Failed to load witness keys")?;
        info!(
            "Log key hash: {}",
            hex::encode(crypto::key_hash(&signer.public_key()))
        );

        wait_for_backend(backend.as_ref(), config.log.backend_deadline()).await?;
        let state = StateManager::new(
            backend.clone(),
            signer,
            witnesses,
            config.log.cosign_interval(),
            config.log.backend_deadline(),
        )
        .await
        .context("Failed to fetch the initial tree head")?;

        Ok(Self {
            config,
            state: Arc::new(state),
            backend,
            task_manager: TaskManager::default(),
        })
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    /// Spawns the rotation loop and the HTTP server. Returns the bound address.
    pub async fn start(&mut self) -> anyhow::Result<SocketAddr> {
        let state = self.state.clone();
        self.task_manager
            .spawn(|cancellation_token| async move { state.run(cancellation_token).await });

        let http = &self.config.http;
        let listener = TcpListener::bind((http.bind_host.as_str(), http.bind_port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", http.bind_host, http.bind_port))?;
        let bound_address = listener.local_addr()?;

        let router = api::router(
            ApiContext {
                state: self.state.clone(),
                backend: self.backend.clone(),
                max_range: self.config.log.max_range,
                deadline: self.config.log.backend_deadline(),
            },
            &http.url_prefix,
        );
        self.task_manager.spawn(|cancellation_token| async move {
            info!("Starting HTTP server at {}", bound_address);
            let server = axum::serve(listener, router)
                .with_graceful_shutdown(async move { cancellation_token.cancelled().await });
            if let Err(e) = server.await {
                error!("HTTP server failed: {}", e);
            }
        });

        Ok(bound_address)
    }

    /// Stops every spawned task.
    pub async fn shutdown(&mut self) {
        self.task_manager.abort().await;
    }

    /// Runs until ctrl-c.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.start().await?;
        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
        self.shutdown().await;
        Ok(())
    }
}

/// Retries the backend until it answers, so that the node can start alongside it.
async fn wait_for_backend(backend: &dyn TreeBackend, deadline: Duration) -> anyhow::Result<()> {
    let exponential_backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(200))
        .with_max_elapsed_time(Some(Duration::from_secs(30)))
        .build();
    let tree_head = retry_backoff(exponential_backoff, || async move {
        with_deadline(deadline, backend.get_tree_head())
            .await
            .map_err(|e| {
                warn!("Backend not ready: {}", e);
                backoff::Error::transient(e)
            })
    })
    .await
    .context("Backend did not become ready")?;
    info!(tree_size = tree_head.tree_size, "Backend is ready");
    Ok(())
}
