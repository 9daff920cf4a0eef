#![allow(dead_code)]

pub use adminagent_test_utils::*;

use std::time::Duration;

use adminagent::notify::{Notification, NotificationBody};

/// How long to wait before concluding no further notification is coming.
pub const SETTLE: Duration = Duration::from_millis(300);

/// Text of a text notification; panics for documents.
pub fn text_of(n: &Notification) -> &str {
    match &n.body {
        NotificationBody::Text { text, .. } => text,
        other => panic!("expected a text notification, got {other:?}"),
    }
}

/// A plain (non-reply) target for `chat`.
pub fn chat(chat: u32) -> adminagent::facade::Target {
    adminagent::facade::Target::from(chat)
}
