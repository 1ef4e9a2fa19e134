use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use valuserver::routes;
use valuserver::Node;
use valuserver::NodeBuilder;
use valuserver::Result;
use valuserver::ValuConfig;

#[allow(dead_code)]
pub struct TestNode {
    pub node: Arc<Node>,
    pub shutdown_tx: watch::Sender<()>,
    pub running: JoinHandle<Result<()>>,
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestNode {
    /// Issue one RPC call through the HTTP routes.
    pub async fn call(
        &self,
        method: &str,
        args: Value,
    ) -> Value {
        let res = warp::test::request()
            .method("POST")
            .path(&format!("/rpc/{}", method))
            .json(&args)
            .reply(&routes(self.node.service().clone()))
            .await;
        assert_eq!(res.status(), 200, "rpc {} failed", method);
        serde_json::from_slice(res.body()).unwrap()
    }

    pub async fn version(
        &self,
        collection: &str,
    ) -> u64 {
        self.node.notifier().snapshot(collection).await.unwrap().version
    }

    pub async fn listeners(
        &self,
        collection: &str,
    ) -> usize {
        self.node.notifier().snapshot(collection).await.unwrap().listeners
    }

    pub async fn wait_for_listeners(
        &self,
        collection: &str,
        expected: usize,
    ) {
        while self.listeners(collection).await != expected {
            tokio::task::yield_now().await;
        }
    }

    /// Stop the node and hand back its data directory.
    pub async fn shutdown(self) -> TempDir {
        self.shutdown_tx.send(()).ok();
        self.running
            .await
            .expect("node task panicked")
            .expect("node stopped with error");
        self.dir
    }
}

pub fn test_config(dir: &TempDir) -> ValuConfig {
    let mut config = ValuConfig::default();
    config.server.filepath = dir.path().to_str().unwrap().to_string();
    config.server.listen_address = "127.0.0.1".to_string();
    config.server.port = 0;
    config.notifier.max_wait_time_sec = 30;
    config
}

pub async fn start_node() -> TestNode {
    let dir = tempfile::tempdir().unwrap();
    start_node_in(dir).await
}

pub async fn start_node_in(dir: TempDir) -> TestNode {
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let node = NodeBuilder::new(test_config(&dir), shutdown_rx)
        .build()
        .unwrap()
        .start_rpc_server()
        .await
        .unwrap()
        .ready()
        .unwrap();

    let running = {
        let node = node.clone();
        tokio::spawn(async move { node.run().await })
    };
    while !node.server_is_ready() {
        tokio::task::yield_now().await;
    }

    TestNode {
        node,
        shutdown_tx,
        running,
        dir,
    }
}
