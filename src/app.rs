//! Wiring: builds the store, the backend and the router from configuration,
//! and runs the expiry janitor.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use taskgate_tasks::execution::InProcessBackend;
use taskgate_tasks::store::memory::InMemoryMetadataStore;
use taskgate_tasks::store::StoreConfig;
use taskgate_tasks::{MetadataStore, TaskCoordinator};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::builtin::register_builtins;
use crate::config::{BrokerConfig, GatewayConfig, StoreKind, StoreSettings};
use crate::http::{router, Timeouts};

/// How often expired records and live states are swept.
pub const JANITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Everything the server needs, built from a [`GatewayConfig`].
#[derive(Clone)]
pub struct Gateway {
    pub store: Arc<dyn MetadataStore>,
    pub backend: Arc<InProcessBackend>,
    pub coordinator: TaskCoordinator,
    timeouts: Timeouts,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("coordinator", &self.coordinator)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Connects the configured store and starts the in-process backend.
    pub async fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let store = build_store(&config.store).await?;
        let backend = Arc::new(build_backend(&config.broker));
        let timeouts = Timeouts {
            read: Duration::from_millis(config.server.read_timeout_ms),
            request: config.request_timeout(),
        };
        Ok(Self::new(store, backend, timeouts))
    }

    pub fn new(
        store: Arc<dyn MetadataStore>,
        backend: Arc<InProcessBackend>,
        timeouts: Timeouts,
    ) -> Self {
        let coordinator = TaskCoordinator::new(backend.clone(), store.clone());
        Self {
            store,
            backend,
            coordinator,
            timeouts,
        }
    }

    pub fn router(&self) -> Router {
        router(self.coordinator.clone(), self.timeouts)
    }

    /// Runs one expiry sweep over the store and the backend.
    pub async fn sweep(&self) {
        match self.store.cleanup_expired().await {
            Ok(0) => {},
            Ok(removed) => tracing::info!(removed, "expired task records removed"),
            Err(e) => tracing::warn!(error = %e, "store cleanup failed"),
        }
        let dropped = self.backend.cleanup_expired();
        if dropped > 0 {
            tracing::debug!(dropped, "expired live states dropped");
        }
    }

    /// Sweeps every `interval` until `cancel` fires.
    pub fn spawn_janitor(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let gateway = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => gateway.sweep().await,
                }
            }
            tracing::debug!("janitor stopped");
        })
    }
}

/// Builds the configured metadata store.
pub async fn build_store(settings: &StoreSettings) -> anyhow::Result<Arc<dyn MetadataStore>> {
    let store_config = StoreConfig::default().with_retention(settings.retention());
    match settings.backend {
        StoreKind::Memory => {
            tracing::info!("using in-memory metadata store");
            let store: Arc<dyn MetadataStore> =
                Arc::new(InMemoryMetadataStore::new().with_config(store_config));
            Ok(store)
        },
        StoreKind::Redis => build_redis_store(settings, store_config).await,
    }
}

#[cfg(feature = "redis")]
async fn build_redis_store(
    settings: &StoreSettings,
    store_config: StoreConfig,
) -> anyhow::Result<Arc<dyn MetadataStore>> {
    use anyhow::Context;
    use taskgate_tasks::store::redis::RedisBackend;
    use taskgate_tasks::store::GenericMetadataStore;

    let url = settings
        .redis_url()
        .context("store.url is required for the redis backend")?;
    let backend = RedisBackend::new(&url)
        .await
        .context("failed to connect to redis")?
        .with_prefix(settings.key_prefix.clone())
        .with_retention(settings.retention());
    tracing::info!(prefix = %settings.key_prefix, "using redis metadata store");
    let store: Arc<dyn MetadataStore> =
        Arc::new(GenericMetadataStore::new(backend).with_config(store_config));
    Ok(store)
}

#[cfg(not(feature = "redis"))]
async fn build_redis_store(
    _settings: &StoreSettings,
    _store_config: StoreConfig,
) -> anyhow::Result<Arc<dyn MetadataStore>> {
    anyhow::bail!("store.backend = \"redis\" requires the `redis` feature")
}

/// Builds the in-process backend with the built-in handlers.
pub fn build_backend(broker: &BrokerConfig) -> InProcessBackend {
    let backend = InProcessBackend::new()
        .with_concurrency(broker.concurrency)
        .with_default_queue(broker.default_queue.clone())
        .with_results_expire_in(broker.results_expire_in());
    let backend = register_builtins(backend);
    tracing::info!(
        concurrency = broker.concurrency,
        queue = %broker.default_queue,
        tasks = ?backend.task_names(),
        "execution backend ready"
    );
    backend
}
