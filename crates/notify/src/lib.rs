//! Notification dispatch for matched alert rules.
//!
//! This crate provides:
//! - `Channel` trait for pluggable delivery channels, plus a log channel
//! - `Notification` records and the `NotificationStore` history interface
//! - Minijinja rendering of notification subject and body
//! - `Dispatcher` that fans a match out to the rule's channels

pub mod dispatcher;
pub mod log_channel;
pub mod record;
pub mod store;
pub mod templating;
pub mod traits;

pub use dispatcher::Dispatcher;
pub use log_channel::LogChannel;
pub use record::{Notification, NotificationStatus};
pub use store::{InMemoryNotificationStore, NotificationQuery, NotificationStore};
pub use traits::{Channel, NotificationPayload, NotifyError};
