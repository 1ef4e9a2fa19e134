use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::oneshot;

pub type Version = u64;
pub type SubscriptionId = u64;

/// A version as it travels on the wire: the caller's string, kept verbatim.
///
/// It matches a [`Version`] only when it is that version's decimal rendering,
/// so `"00"` or `"v1"` never match and count as stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(
        &self,
        version: Version,
    ) -> bool {
        self.0 == version.to_string()
    }
}

impl From<Version> for VersionToken {
    fn from(version: Version) -> Self {
        Self(version.to_string())
    }
}

impl fmt::Display for VersionToken {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A successful mutation of `collection`, produced by a mutation handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    pub collection: String,
}

/// What a waiting subscriber receives: the post-increment version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub collection: String,
    pub version: Version,
}

/// One in-flight long-poll registration.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub collection: String,
    /// `None` when the caller has nothing to compare against yet.
    pub previous_version: Option<VersionToken>,
    pub sender: mpsc::Sender<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribe {
    pub id: SubscriptionId,
    pub collection: String,
}

#[derive(Debug)]
pub struct SnapshotRequest {
    pub collection: String,
    pub reply: oneshot::Sender<CollectionSnapshot>,
}

/// Point-in-time view of one collection's notifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSnapshot {
    /// `UNSET_VERSION` until the first mutation is observed.
    pub version: Version,
    pub listeners: usize,
}
