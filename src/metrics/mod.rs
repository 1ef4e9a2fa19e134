use std::sync::Once;

use autometrics::prometheus_exporter;
use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    pub static ref RPC_CALLS: IntCounterVec = IntCounterVec::new(
        Opts::new("rpc_calls_total", "RPC calls received, by method"),
        &["method"]
    )
    .expect("metric can not be created");

    pub static ref NOTIFICATIONS_DELIVERED: IntCounter = IntCounter::new(
        "notifications_delivered_total",
        "Versions handed to a waiting subscriber"
    )
    .expect("metric can not be created");

    pub static ref NOTIFICATIONS_DROPPED: IntCounter = IntCounter::new(
        "notifications_dropped_total",
        "Deliveries dropped because the subscriber channel was full or closed"
    )
    .expect("metric can not be created");

    pub static ref LONG_POLL_TIMEOUTS: IntCounter = IntCounter::new(
        "long_poll_timeouts_total",
        "Long-poll calls that ended on their deadline"
    )
    .expect("metric can not be created");

    pub static ref ACTIVE_SUBSCRIPTIONS: IntGauge = IntGauge::new(
        "active_subscriptions",
        "Subscriptions currently registered with the notifier"
    )
    .expect("metric can not be created");

    pub static ref COLLECTION_VERSION: IntGaugeVec = IntGaugeVec::new(
        Opts::new("collection_version", "Current in-memory version per collection"),
        &["collection"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

/// Idempotent; safe to call from several servers or tests.
pub fn register_custom_metrics() {
    REGISTER.call_once(|| {
        if let Err(e) = register_collectors(&REGISTRY) {
            error!("collector can not be registered: {}", e);
        }
    });
}

pub(crate) fn register_collectors(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(RPC_CALLS.clone()))?;
    registry.register(Box::new(NOTIFICATIONS_DELIVERED.clone()))?;
    registry.register(Box::new(NOTIFICATIONS_DROPPED.clone()))?;
    registry.register(Box::new(LONG_POLL_TIMEOUTS.clone()))?;
    registry.register(Box::new(ACTIVE_SUBSCRIPTIONS.clone()))?;
    registry.register(Box::new(COLLECTION_VERSION.clone()))?;
    Ok(())
}

pub fn metrics_route() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("metrics").and(warp::get()).and_then(metrics_handler)
}

pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics();

    let (addr, server) =
        warp::serve(metrics_route()).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    info!("metrics server listening on {}", addr);
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    let mut res = encode_custom_metrics(&REGISTRY);
    res.push_str(&get_metrics_body());
    Ok(res)
}

pub fn encode_custom_metrics(registry: &Registry) -> String {
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}

/// Export autometrics function metrics for Prometheus to scrape
pub fn get_metrics_body() -> String {
    prometheus_exporter::encode_http_response().into_body()
}
