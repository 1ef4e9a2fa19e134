//! A builder for assembling a [`Node`].
//!
//! ## Key Design Points
//! - **Default Components**: opens a sled store at `server.filepath/server.dbname` unless a
//!   storage engine is supplied.
//! - **Lifecycle Management**:
//!   - `build()`: opens the store, preloads existing collections and spawns the notifier.
//!   - `start_metrics_server()` / `start_rpc_server()`: launch the HTTP listeners.
//!   - `ready()`: returns the assembled [`Node`].
//!
//! ## Example
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let node = NodeBuilder::new(config, shutdown_rx)
//!     .build()?
//!     .start_metrics_server(shutdown_tx.subscribe())
//!     .start_rpc_server()
//!     .await?
//!     .ready()?;
//! ```
//!
//! Every step that can fail returns an error instead of panicking: a store that
//! cannot be opened or a port that cannot be bound aborts start-up.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::metrics;
use crate::rpc;
use crate::CollectionRegistry;
use crate::Error;
use crate::Node;
use crate::Notifier;
use crate::Result;
use crate::RpcService;
use crate::SledStorageEngine;
use crate::StorageEngine;
use crate::ValuConfig;

pub struct NodeBuilder {
    pub(super) config: ValuConfig,
    pub(super) engine: Option<Arc<dyn StorageEngine>>,
    pub(super) shutdown_signal: watch::Receiver<()>,

    pub(super) node: Option<Node>,
}

impl NodeBuilder {
    pub fn new(
        config: ValuConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            engine: None,
            shutdown_signal,
            node: None,
        }
    }

    /// Use `engine` instead of opening the configured sled store.
    pub fn storage_engine(
        mut self,
        engine: Arc<dyn StorageEngine>,
    ) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Replaces the entire configuration
    pub fn config(
        mut self,
        config: ValuConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Open the store, preload its collections and spawn the notifier.
    pub fn build(mut self) -> Result<Self> {
        let config = Arc::new(self.config.clone());

        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => {
                let db_path = config.server.db_path();
                let engine: Arc<dyn StorageEngine> = Arc::new(SledStorageEngine::open(&db_path)?);
                engine
            }
        };

        let registry = Arc::new(CollectionRegistry::new(engine.clone()));
        registry.preload()?;

        let (notifier, notifier_handle) = Notifier::new(&config.notifier, self.shutdown_signal.clone());
        let notifier_task = tokio::spawn(async move {
            let result = notifier.run().await;
            if let Err(e) = &result {
                error!("notifier exit with unexpected error: {:?}", e);
            }
            result
        });

        let service = Arc::new(RpcService::new(
            registry,
            notifier_handle,
            Duration::from_secs(config.notifier.max_wait_time_sec),
        ));

        self.node = Some(Node {
            config,
            engine,
            service,
            notifier_task: Mutex::new(Some(notifier_task)),
            rpc_task: Mutex::new(None),
            rpc_addr: None,
            shutdown_signal: self.shutdown_signal.clone(),
            ready: AtomicBool::new(false),
        });
        Ok(self)
    }

    /// Starts the Prometheus endpoint when monitoring is enabled.
    pub fn start_metrics_server(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if !self.config.monitoring.prometheus_enabled {
            debug!("prometheus exporter disabled");
            return self;
        }

        let port = self.config.monitoring.prometheus_port;
        info!(port, "start metrics server");
        tokio::spawn(async move {
            metrics::start_server(port, shutdown_signal).await;
        });
        self
    }

    /// Bind the RPC listener and serve it in the background.
    pub async fn start_rpc_server(mut self) -> Result<Self> {
        let Some(node) = self.node.as_mut() else {
            return Err(Error::Fatal("start_rpc_server called before build".to_string()));
        };

        let addr = self.config.server.socket_addr()?;
        let (bound, server) =
            rpc::bind_rpc_server(node.service.clone(), addr, self.shutdown_signal.clone())?;
        node.rpc_addr = Some(bound);
        node.rpc_task = Mutex::new(Some(tokio::spawn(server)));

        Ok(self)
    }

    /// Returns the built node instance.
    pub fn ready(self) -> Result<Arc<Node>> {
        self.node
            .map(Arc::new)
            .ok_or_else(|| Error::Fatal("node was not built".to_string()))
    }
}
