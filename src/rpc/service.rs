//! RPC method handlers.
//!
//! Every collection method runs the same steps: validate arguments, compile
//! the expression (when there is one), resolve the collection, call the
//! storage primitive, then decide whether the call changed anything:
//!
//! | method        | notifies when                  |
//! |---------------|--------------------------------|
//! | `put-value`   | the write succeeded            |
//! | `update`      | at least one record changed    |
//! | `take-values` | at least one record was taken  |
//! | `get-values`  | never                          |
//!
//! Failures are turned into reply values here; nothing a caller sends can
//! take the process down.

use std::sync::Arc;
use std::time::Duration;

use autometrics::autometrics;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use super::args::collection_args;
use super::args::render_version;
use super::args::ListenerInfo;
use super::reply;
use crate::constants::METHOD_GET_VALUES;
use crate::constants::METHOD_LONG_WAITER;
use crate::constants::METHOD_PUT_VALUE;
use crate::constants::METHOD_TAKE_VALUES;
use crate::constants::METHOD_UPDATE;
use crate::constants::REPLY_KEY_TIMED_OUT;
use crate::constants::REPLY_KEY_VERSION;
use crate::Collection;
use crate::CollectionRegistry;
use crate::LongPollWaiter;
use crate::NotifierHandle;
use crate::Predicate;
use crate::RpcError;
use crate::Transform;
use crate::API_SLO;
use crate::RPC_CALLS;

pub struct RpcService {
    registry: Arc<CollectionRegistry>,
    notifier: NotifierHandle,
    waiter: LongPollWaiter,
}

impl std::fmt::Debug for RpcService {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RpcService")
            .field("registry", &self.registry)
            .field("max_wait", &self.waiter.max_wait())
            .finish()
    }
}

impl RpcService {
    pub fn new(
        registry: Arc<CollectionRegistry>,
        notifier: NotifierHandle,
        max_wait: Duration,
    ) -> Self {
        let waiter = LongPollWaiter::new(notifier.clone(), max_wait);
        Self {
            registry,
            notifier,
            waiter,
        }
    }

    pub fn registry(&self) -> &Arc<CollectionRegistry> {
        &self.registry
    }

    pub fn notifier(&self) -> &NotifierHandle {
        &self.notifier
    }

    /// Route a named procedure to its handler.
    pub async fn dispatch(
        &self,
        method: &str,
        args: &[Value],
    ) -> Value {
        match method {
            METHOD_PUT_VALUE => self.put_value(args).await,
            METHOD_GET_VALUES => self.get_values(args).await,
            METHOD_TAKE_VALUES => self.take_values(args).await,
            METHOD_UPDATE => self.update(args).await,
            METHOD_LONG_WAITER => self.long_waiter(args).await,
            unknown => {
                debug!(method = %unknown, "unknown rpc method");
                reply::failure(RpcError::UnknownMethod(unknown.to_string()))
            }
        }
    }

    /// Unconditional write; notifies on success.
    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    #[tracing::instrument(skip(self, args))]
    pub async fn put_value(
        &self,
        args: &[Value],
    ) -> Value {
        RPC_CALLS.with_label_values(&[METHOD_PUT_VALUE]).inc();

        let (name, collection, value) = match self.prepare(args, |payload| Ok(payload.clone())) {
            Ok(target) => target,
            Err(failure) => return failure,
        };

        match collection.put_value(value) {
            Ok(()) => {
                self.notify(name).await;
                reply::success(Value::Null)
            }
            Err(e) => {
                warn!(collection = %name, "put-value failed: {}", e);
                reply::storage_failure(e)
            }
        }
    }

    /// Read-only; never notifies.
    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    #[tracing::instrument(skip(self, args))]
    pub async fn get_values(
        &self,
        args: &[Value],
    ) -> Value {
        RPC_CALLS.with_label_values(&[METHOD_GET_VALUES]).inc();

        let (name, collection, filter) = match self.prepare(args, Predicate::compile) {
            Ok(target) => target,
            Err(failure) => return failure,
        };

        match collection.get_values(&filter) {
            Ok(values) => reply::success(Value::Array(values)),
            Err(e) => {
                warn!(collection = %name, "get-values failed: {}", e);
                reply::storage_failure(e)
            }
        }
    }

    /// Remove-and-return; notifies only when something was taken.
    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    #[tracing::instrument(skip(self, args))]
    pub async fn take_values(
        &self,
        args: &[Value],
    ) -> Value {
        RPC_CALLS.with_label_values(&[METHOD_TAKE_VALUES]).inc();

        let (name, collection, filter) = match self.prepare(args, Predicate::compile) {
            Ok(target) => target,
            Err(failure) => return failure,
        };

        match collection.take_values(&filter) {
            Ok(taken) => {
                if !taken.is_empty() {
                    self.notify(name).await;
                }
                reply::success(Value::Array(taken))
            }
            Err(e) => {
                warn!(collection = %name, "take-values failed: {}", e);
                reply::storage_failure(e)
            }
        }
    }

    /// In-place rewrite; notifies only when a record actually changed.
    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    #[tracing::instrument(skip(self, args))]
    pub async fn update(
        &self,
        args: &[Value],
    ) -> Value {
        RPC_CALLS.with_label_values(&[METHOD_UPDATE]).inc();

        let (name, collection, transform) = match self.prepare(args, Transform::compile) {
            Ok(target) => target,
            Err(failure) => return failure,
        };

        match collection.update(&transform) {
            Ok(changed) => {
                if changed {
                    self.notify(name).await;
                }
                reply::success(Value::Bool(changed))
            }
            Err(e) => {
                warn!(collection = %name, "update failed: {}", e);
                reply::storage_failure(e)
            }
        }
    }

    /// Long-poll for the next version of a collection.
    #[cfg_attr(not(doc), autometrics(objective = API_SLO))]
    #[tracing::instrument(skip(self, args))]
    pub async fn long_waiter(
        &self,
        args: &[Value],
    ) -> Value {
        RPC_CALLS.with_label_values(&[METHOD_LONG_WAITER]).inc();

        let Some(config) = args.first() else {
            return reply::listener_failure(RpcError::NoArguments);
        };
        let request = match ListenerInfo::parse(config).and_then(ListenerInfo::into_request) {
            Ok(request) => request,
            Err(e) => return reply::listener_failure(e),
        };

        match self.waiter.wait(request).await {
            Ok(outcome) => {
                let mut body = Map::new();
                body.insert(
                    REPLY_KEY_VERSION.to_string(),
                    Value::String(render_version(outcome.version.as_ref())),
                );
                body.insert(REPLY_KEY_TIMED_OUT.to_string(), Value::Bool(outcome.timed_out));
                reply::success(Value::Object(body))
            }
            Err(e) => {
                warn!("long poll aborted: {}", e);
                reply::listener_failure(e)
            }
        }
    }

    /// Validate, compile the payload, then resolve the collection.
    ///
    /// The payload is compiled before resolution so that a malformed
    /// expression never creates a collection.
    fn prepare<'a, T>(
        &self,
        args: &'a [Value],
        compile: impl FnOnce(&Value) -> std::result::Result<T, RpcError>,
    ) -> std::result::Result<(&'a str, Arc<dyn Collection>, T), Value> {
        let (name, payload) = collection_args(args).map_err(reply::failure)?;
        let compiled = compile(payload).map_err(reply::failure)?;
        let collection = self.registry.resolve(name).map_err(reply::collection_failure)?;
        Ok((name, collection, compiled))
    }

    /// Notification is best effort: the write already happened.
    async fn notify(
        &self,
        name: &str,
    ) {
        if let Err(e) = self.notifier.submit_update(name).await {
            warn!(collection = %name, "change notification not submitted: {}", e);
        }
    }
}
