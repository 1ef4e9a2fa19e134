use std::time::Duration;

use tokio::time::timeout_at;
use tokio::time::Instant;
use tracing::debug;

use super::NotifierHandle;
use super::VersionToken;
use crate::NotifierError;
use crate::Result;
use crate::LONG_POLL_TIMEOUTS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongPollRequest {
    pub collection: String,
    pub is_first_call: bool,
    /// Ignored on a first call.
    pub known_version: Option<VersionToken>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome {
    /// On timeout, the caller's own version echoed back; `None` only for a
    /// first call that timed out.
    pub version: Option<VersionToken>,
    pub timed_out: bool,
}

/// Blocks one long-poll call until a notification or its deadline.
#[derive(Debug, Clone)]
pub struct LongPollWaiter {
    notifier: NotifierHandle,
    max_wait: Duration,
}

impl LongPollWaiter {
    pub fn new(
        notifier: NotifierHandle,
        max_wait: Duration,
    ) -> Self {
        Self { notifier, max_wait }
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub async fn wait(
        &self,
        request: LongPollRequest,
    ) -> Result<WaitOutcome> {
        let previous = if request.is_first_call {
            None
        } else {
            request.known_version
        };
        let timeout = request.timeout.min(self.max_wait);
        // One deadline covers queueing the subscription and waiting on it.
        let deadline = Instant::now() + timeout;
        let timed_out = WaitOutcome {
            version: previous.clone(),
            timed_out: true,
        };

        let outcome = if timeout.is_zero() {
            timed_out
        } else {
            match timeout_at(deadline, self.notifier.subscribe(&request.collection, previous)).await {
                // Subscribe queue stayed full until the deadline.
                Err(_) => timed_out,
                Ok(subscription) => {
                    let mut subscription = subscription?;
                    let received = timeout_at(deadline, subscription.recv()).await;
                    drop(subscription);
                    match received {
                        Ok(Some(notification)) => WaitOutcome {
                            version: Some(notification.version.into()),
                            timed_out: false,
                        },
                        Ok(None) => return Err(NotifierError::ChannelClosed("delivery").into()),
                        Err(_) => timed_out,
                    }
                }
            }
        };

        if outcome.timed_out {
            LONG_POLL_TIMEOUTS.inc();
        }
        debug!(
            collection = %request.collection,
            version = ?outcome.version,
            timed_out = outcome.timed_out,
            "long poll finished"
        );
        Ok(outcome)
    }
}
