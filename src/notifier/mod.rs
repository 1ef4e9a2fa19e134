//! Change notification for collections.
//!
//! ```text
//! mutation handler --submit_update--> [update queue]      \
//! long-poll waiter --subscribe------> [subscribe queue]    >-- Notifier::run --try_send--> waiter
//! SubscriptionGuard::drop ----------> [unsubscribe queue] /
//! ```
//!
//! The [`Notifier`] task is the only owner of the per-collection versions and
//! listener sets. Deliveries never block it: each subscription has a one-slot
//! channel, and a notification that does not fit is dropped. A dropped
//! notification delays that waiter until its own deadline, nothing more.

mod actor;
mod event;
mod handle;
mod waiter;


pub use actor::*;
pub use event::*;
pub use handle::*;
pub use waiter::*;
