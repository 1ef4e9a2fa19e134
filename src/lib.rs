//! A collection-oriented key/value store served over RPC, with long-poll
//! change notification per collection.
//!
//! Mutating calls (`put-value`, `take-values`, `update`) report to a single
//! [`Notifier`] task that versions each collection and wakes the
//! `valu-long-waiter` calls registered on it.

mod config;
pub mod constants;
mod errors;
mod expr;
mod metrics;
mod node;
mod notifier;
mod rpc;
mod storage;
pub mod utils;

pub use config::*;
pub use errors::*;
pub use expr::*;
pub use metrics::*;
pub use node::*;
pub use notifier::*;
pub use rpc::*;
pub use storage::*;

//-----------------------------------------------------------
// Autometrics
/// autometrics: https://docs.autometrics.dev/rust/adding-alerts-and-slos
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;
const API_SLO: Objective = Objective::new("api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
