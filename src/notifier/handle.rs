use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::debug;

use super::CollectionSnapshot;
use super::Notification;
use super::SnapshotRequest;
use super::Subscription;
use super::SubscriptionId;
use super::Unsubscribe;
use super::UpdateEvent;
use super::VersionToken;
use crate::NotifierError;
use crate::Result;

/// Message-passing front of the [`Notifier`](super::Notifier). Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    pub(super) update_tx: mpsc::Sender<UpdateEvent>,
    pub(super) subscribe_tx: mpsc::Sender<Subscription>,
    pub(super) unsubscribe_tx: mpsc::UnboundedSender<Unsubscribe>,
    pub(super) snapshot_tx: mpsc::Sender<SnapshotRequest>,
    pub(super) next_id: Arc<AtomicU64>,
}

impl NotifierHandle {
    /// Report a completed mutation of `collection`.
    ///
    /// Waits only while the update queue is full.
    pub async fn submit_update(
        &self,
        collection: &str,
    ) -> Result<()> {
        self.update_tx
            .send(UpdateEvent {
                collection: collection.to_string(),
            })
            .await
            .map_err(|_| NotifierError::ChannelClosed("update"))?;
        Ok(())
    }

    /// Register interest in `collection`.
    ///
    /// The returned guard owns the delivery channel and retires the
    /// subscription when dropped, whatever way the caller leaves its wait.
    pub async fn subscribe(
        &self,
        collection: &str,
        previous_version: Option<VersionToken>,
    ) -> Result<SubscriptionGuard> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(1);

        let guard = SubscriptionGuard {
            id,
            collection: collection.to_string(),
            receiver: Some(receiver),
            unsubscribe_tx: self.unsubscribe_tx.clone(),
        };

        self.subscribe_tx
            .send(Subscription {
                id,
                collection: collection.to_string(),
                previous_version,
                sender,
            })
            .await
            .map_err(|_| NotifierError::ChannelClosed("subscribe"))?;

        Ok(guard)
    }

    /// Current version and listener count of `collection`, observed after
    /// every event queued before this call has been applied.
    pub async fn snapshot(
        &self,
        collection: &str,
    ) -> Result<CollectionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.snapshot_tx
            .send(SnapshotRequest {
                collection: collection.to_string(),
                reply,
            })
            .await
            .map_err(|_| NotifierError::ChannelClosed("snapshot"))?;
        let snapshot = rx.await.map_err(|_| NotifierError::ReplyDropped("snapshot"))?;
        Ok(snapshot)
    }
}

/// Live subscription. Dropping it unsubscribes exactly once.
#[derive(Debug)]
pub struct SubscriptionGuard {
    id: SubscriptionId,
    collection: String,
    receiver: Option<mpsc::Receiver<Notification>>,
    unsubscribe_tx: mpsc::UnboundedSender<Unsubscribe>,
}

impl SubscriptionGuard {
    /// Next delivered notification; `None` once the notifier closed the channel.
    pub async fn recv(&mut self) -> Option<Notification> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => None,
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        // Close our end first so the actor can skip a not yet processed Subscribe.
        drop(self.receiver.take());

        let unsubscribe = Unsubscribe {
            id: self.id,
            collection: std::mem::take(&mut self.collection),
        };
        if self.unsubscribe_tx.send(unsubscribe).is_err() {
            debug!(subscription_id = self.id, "notifier gone, nothing to unsubscribe");
        }
    }
}
