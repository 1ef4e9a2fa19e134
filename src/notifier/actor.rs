use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::trace;

use super::CollectionSnapshot;
use super::Notification;
use super::NotifierHandle;
use super::SnapshotRequest;
use super::Subscription;
use super::SubscriptionId;
use super::Unsubscribe;
use super::UpdateEvent;
use super::Version;
use crate::constants::INITIAL_VERSION;
use crate::constants::MAX_GAUGED_COLLECTIONS;
use crate::constants::UNSET_VERSION;
use crate::NotifierConfig;
use crate::Result;
use crate::ACTIVE_SUBSCRIPTIONS;
use crate::COLLECTION_VERSION;
use crate::NOTIFICATIONS_DELIVERED;
use crate::NOTIFICATIONS_DROPPED;

const SNAPSHOT_QUEUE_SIZE: usize = 16;

/// Sole owner of the version table and the listener sets.
///
/// Every mutation of that state happens inside [`Notifier::run`], one event
/// at a time. Other components only hold a [`NotifierHandle`].
pub struct Notifier {
    versions: HashMap<String, Version>,
    listeners: HashMap<String, HashMap<SubscriptionId, mpsc::Sender<Notification>>>,

    /// Collections exported on the version gauge, at most `gauge_limit`.
    gauged: HashSet<String>,
    pub(super) gauge_limit: usize,

    update_rx: mpsc::Receiver<UpdateEvent>,
    subscribe_rx: mpsc::Receiver<Subscription>,
    unsubscribe_rx: mpsc::UnboundedReceiver<Unsubscribe>,
    snapshot_rx: mpsc::Receiver<SnapshotRequest>,

    shutdown_signal: watch::Receiver<()>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("collections", &self.versions.len())
            .field("listener_sets", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(
        config: &NotifierConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> (Self, NotifierHandle) {
        let (update_tx, update_rx) = mpsc::channel(config.update_queue_size);
        let (subscribe_tx, subscribe_rx) = mpsc::channel(config.subscribe_queue_size);
        let (unsubscribe_tx, unsubscribe_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = mpsc::channel(SNAPSHOT_QUEUE_SIZE);

        let notifier = Self {
            versions: HashMap::new(),
            listeners: HashMap::new(),
            gauged: HashSet::new(),
            gauge_limit: MAX_GAUGED_COLLECTIONS,
            update_rx,
            subscribe_rx,
            unsubscribe_rx,
            snapshot_rx,
            shutdown_signal,
        };
        let handle = NotifierHandle {
            update_tx,
            subscribe_tx,
            unsubscribe_tx,
            snapshot_tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (notifier, handle)
    }

    /// Process events until shutdown or until every handle is gone.
    ///
    /// Queues are polled in a fixed order: updates, subscribes, unsubscribes.
    /// An update queued before a subscribe is applied first, and an
    /// `Unsubscribe` is never observed before the `Subscribe` it retires.
    pub async fn run(mut self) -> Result<()> {
        info!("notifier started");
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_signal.changed() => {
                    info!("[Notifier] shutdown signal received.");
                    break;
                }
                Some(update) = self.update_rx.recv() => {
                    self.handle_update(update);
                }
                Some(subscription) = self.subscribe_rx.recv() => {
                    self.handle_subscribe(subscription);
                }
                Some(unsubscribe) = self.unsubscribe_rx.recv() => {
                    self.handle_unsubscribe(unsubscribe);
                }
                Some(request) = self.snapshot_rx.recv() => {
                    self.drain_pending();
                    self.handle_snapshot(request);
                }
                else => {
                    info!("[Notifier] all handles dropped.");
                    break;
                }
            }
        }
        self.close_all();
        Ok(())
    }

    pub(super) fn handle_update(
        &mut self,
        update: UpdateEvent,
    ) {
        let entry = self
            .versions
            .entry(update.collection.clone())
            .or_insert(INITIAL_VERSION);
        *entry += 1;
        let version = *entry;

        self.export_version(&update.collection, version);

        let Some(targets) = self.listeners.get(&update.collection) else {
            trace!(collection = %update.collection, version, "no listeners");
            return;
        };

        debug!(
            collection = %update.collection,
            version,
            listeners = targets.len(),
            "notifying listeners"
        );
        for (id, sender) in targets {
            deliver(
                *id,
                sender,
                Notification {
                    collection: update.collection.clone(),
                    version,
                },
            );
        }
    }

    pub(super) fn handle_subscribe(
        &mut self,
        subscription: Subscription,
    ) {
        let Subscription {
            id,
            collection,
            previous_version,
            sender,
        } = subscription;

        // Waiter already gone; its Unsubscribe is queued or delivered.
        if sender.is_closed() {
            trace!(subscription_id = id, collection = %collection, "skip closed subscription");
            return;
        }

        if let Some(previous) = previous_version {
            let current = self.current_version(&collection);
            if !previous.matches(current) {
                debug!(
                    subscription_id = id,
                    collection = %collection,
                    %previous,
                    current,
                    "stale version, notifying immediately"
                );
                deliver(
                    id,
                    &sender,
                    Notification {
                        collection: collection.clone(),
                        version: current,
                    },
                );
            }
        }

        if self
            .listeners
            .entry(collection)
            .or_default()
            .insert(id, sender)
            .is_none()
        {
            ACTIVE_SUBSCRIPTIONS.inc();
        }
    }

    pub(super) fn handle_unsubscribe(
        &mut self,
        unsubscribe: Unsubscribe,
    ) {
        let Some(targets) = self.listeners.get_mut(&unsubscribe.collection) else {
            return;
        };
        // Dropping the sender closes the delivery channel.
        if targets.remove(&unsubscribe.id).is_some() {
            ACTIVE_SUBSCRIPTIONS.dec();
            trace!(
                subscription_id = unsubscribe.id,
                collection = %unsubscribe.collection,
                "unsubscribed"
            );
        }
        if targets.is_empty() {
            self.listeners.remove(&unsubscribe.collection);
        }
    }

    pub(super) fn handle_snapshot(
        &self,
        request: SnapshotRequest,
    ) {
        let snapshot = CollectionSnapshot {
            version: self.current_version(&request.collection),
            listeners: self.listeners.get(&request.collection).map_or(0, HashMap::len),
        };
        if request.reply.send(snapshot).is_err() {
            debug!(collection = %request.collection, "snapshot requester went away");
        }
    }

    /// Apply everything queued ahead of a snapshot request.
    fn drain_pending(&mut self) {
        while let Ok(update) = self.update_rx.try_recv() {
            self.handle_update(update);
        }
        while let Ok(subscription) = self.subscribe_rx.try_recv() {
            self.handle_subscribe(subscription);
        }
        while let Ok(unsubscribe) = self.unsubscribe_rx.try_recv() {
            self.handle_unsubscribe(unsubscribe);
        }
    }

    /// Collection names come from clients, so the label set is capped.
    fn export_version(
        &mut self,
        collection: &str,
        version: Version,
    ) {
        if !self.gauged.contains(collection) {
            if self.gauged.len() >= self.gauge_limit {
                return;
            }
            self.gauged.insert(collection.to_string());
        }
        COLLECTION_VERSION.with_label_values(&[collection]).set(version as i64);
    }

    fn close_all(&mut self) {
        let remaining: usize = self.listeners.values().map(HashMap::len).sum();
        ACTIVE_SUBSCRIPTIONS.sub(remaining as i64);
        self.listeners.clear();
        info!(dropped_listeners = remaining, "notifier stopped");
    }

    fn current_version(
        &self,
        collection: &str,
    ) -> Version {
        self.versions.get(collection).copied().unwrap_or(UNSET_VERSION)
    }
}

/// Never blocks: a full or closed channel drops the notification.
fn deliver(
    id: SubscriptionId,
    sender: &mpsc::Sender<Notification>,
    notification: Notification,
) {
    match sender.try_send(notification) {
        Ok(()) => {
            NOTIFICATIONS_DELIVERED.inc();
        }
        Err(TrySendError::Full(n)) => {
            NOTIFICATIONS_DROPPED.inc();
            trace!(subscription_id = id, version = n.version, "subscriber busy, dropped");
        }
        Err(TrySendError::Closed(n)) => {
            NOTIFICATIONS_DROPPED.inc();
            trace!(subscription_id = id, version = n.version, "subscriber closed, dropped");
        }
    }
}
