//! HTTP transport for the RPC surface.
//!
//! `POST /rpc/<method>` takes a JSON array of positional arguments and
//! replies with the handler's result value. `GET /health` replies `"ok"`.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use super::RpcService;
use crate::Error;
use crate::Result;

/// Request bodies above this size are rejected with 413.
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

pub fn routes(service: Arc<RpcService>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&"ok"));

    let rpc = warp::path!("rpc" / String)
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_service(service))
        .and_then(rpc_handler);

    health.or(rpc)
}

fn with_service(service: Arc<RpcService>) -> impl Filter<Extract = (Arc<RpcService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn rpc_handler(
    method: String,
    body: Value,
    service: Arc<RpcService>,
) -> std::result::Result<impl Reply, Rejection> {
    let args = positional_args(body);
    let result = service.dispatch(&method, &args).await;
    Ok(warp::reply::json(&result))
}

/// A non-array body is a single positional argument.
pub fn positional_args(body: Value) -> Vec<Value> {
    match body {
        Value::Array(args) => args,
        other => vec![other],
    }
}

/// Bind the RPC server; it stops accepting calls once `shutdown_signal` fires.
///
/// Returns the bound address and the future that serves connections.
pub fn bind_rpc_server(
    service: Arc<RpcService>,
    addr: SocketAddr,
    mut shutdown_signal: watch::Receiver<()>,
) -> Result<(SocketAddr, impl Future<Output = ()>)> {
    let (bound, server) = warp::serve(routes(service))
        .try_bind_with_graceful_shutdown(addr, async move {
            let _ = shutdown_signal.changed().await;
            info!("rpc server received shutdown signal");
        })
        .map_err(|e| Error::Fatal(format!("failed to bind rpc server on {}: {}", addr, e)))?;

    info!("rpc server listening on {}", bound);
    Ok((bound, server))
}
