//! A running value server.
//!
//! ## Key Responsibilities
//! - Owns the storage engine handle and closes it on shutdown
//! - Holds the collection registry and the notifier handle shared by all RPC calls
//! - Tracks readiness for the health of the process
//!
//! ## Example Usage
//! ```rust,ignore
//! let node = NodeBuilder::new(config, shutdown_rx).build()?.start_rpc_server().await?.ready()?;
//! node.run().await?;
//! ```

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;
use tracing::warn;

use crate::CollectionRegistry;
use crate::NotifierHandle;
use crate::Result;
use crate::RpcService;
use crate::StorageEngine;
use crate::ValuConfig;

pub struct Node {
    pub(crate) config: Arc<ValuConfig>,
    pub(crate) engine: Arc<dyn StorageEngine>,
    pub(crate) service: Arc<RpcService>,
    pub(crate) notifier_task: Mutex<Option<JoinHandle<Result<()>>>>,
    pub(crate) rpc_task: Mutex<Option<JoinHandle<()>>>,
    pub(crate) rpc_addr: Option<SocketAddr>,
    pub(crate) shutdown_signal: watch::Receiver<()>,
    pub(crate) ready: AtomicBool,
}

impl std::fmt::Debug for Node {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("rpc_addr", &self.rpc_addr)
            .field("ready", &self.server_is_ready())
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Serve until the shutdown signal fires, then close the store.
    ///
    /// The RPC server and the notifier watch the same signal. The store is
    /// closed only after the server has finished its in-flight calls; pending
    /// long-poll calls end when the notifier stops.
    pub async fn run(&self) -> Result<()> {
        self.set_ready(true);
        info!(rpc_addr = ?self.rpc_addr, "value server ready");

        let mut shutdown_signal = self.shutdown_signal.clone();
        let _ = shutdown_signal.changed().await;
        info!("shutdown signal received, draining rpc server");
        self.set_ready(false);

        if let Some(server) = self.rpc_task.lock().await.take() {
            if let Err(e) = server.await {
                warn!("rpc server task failed: {:?}", e);
            }
        }

        info!("closing store");
        self.engine.close()?;

        if let Some(task) = self.notifier_task.lock().await.take() {
            if let Err(e) = task.await? {
                warn!("notifier stopped with error: {:?}", e);
            }
        }
        Ok(())
    }

    pub fn set_ready(
        &self,
        is_ready: bool,
    ) {
        self.ready.store(is_ready, Ordering::SeqCst);
    }

    pub fn server_is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &ValuConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<RpcService> {
        &self.service
    }

    pub fn registry(&self) -> &Arc<CollectionRegistry> {
        self.service.registry()
    }

    pub fn notifier(&self) -> &NotifierHandle {
        self.service.notifier()
    }

    /// Address the RPC server is bound to, once started.
    pub fn rpc_addr(&self) -> Option<SocketAddr> {
        self.rpc_addr
    }
}
