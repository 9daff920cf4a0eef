// src/notify/mod.rs

//! Outbound notifications to the operator chat.
//!
//! - [`message`] defines the [`Notification`] value and the JSON payloads.
//! - [`transport`] provides the [`Transport`] trait and the production
//!   [`HttpTransport`] that talks to the messaging endpoint.
//! - [`dispatcher`] owns the queue: callers get a cloneable [`Notifier`] whose
//!   `send_*` methods validate, enqueue and return immediately, while the
//!   dispatcher loop hands every notification to its own delivery task.
//!
//! Delivery is best effort: one attempt, no retry, no ordering between
//! notifications, and failures are only visible in the log.

pub mod dispatcher;
pub mod message;
pub mod transport;

pub use dispatcher::{spawn_dispatcher, Notifier};
pub use message::{Notification, NotificationBody, NotifyError, MAX_MESSAGE_LEN};
pub use transport::{Delivery, DeliveryFuture, HttpTransport, Transport};
