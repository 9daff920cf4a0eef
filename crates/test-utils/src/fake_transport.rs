use std::sync::{Arc, Mutex};
use std::time::Duration;

use adminagent::notify::{Delivery, DeliveryFuture, Notification, Transport};

/// Transport that records every notification and answers `200 OK`.
pub struct FakeTransport {
    sent: Sent,
}

impl FakeTransport {
    pub fn new() -> (Self, Sent) {
        let sent = Sent::default();
        (Self { sent: sent.clone() }, sent)
    }
}

impl Transport for FakeTransport {
    fn deliver(&self, notification: Notification) -> DeliveryFuture {
        self.sent.0.lock().unwrap().push(notification);
        Box::pin(async {
            Ok(Delivery {
                status: 200,
                chunks: 1,
                body: r#"{"ok":true}"#.to_string(),
            })
        })
    }
}

/// Shared view of what a [`FakeTransport`] has delivered.
#[derive(Clone, Default)]
pub struct Sent(Arc<Mutex<Vec<Notification>>>);

impl Sent {
    pub fn snapshot(&self) -> Vec<Notification> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `n` notifications were delivered, then return them.
    ///
    /// Panics after 5 seconds.
    pub async fn wait_for(&self, n: usize) -> Vec<Notification> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let sent = self.snapshot();
            if sent.len() >= n {
                return sent;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("expected {n} notifications, got {}: {sent:?}", sent.len());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Check that nothing more arrives within `settle`.
    pub async fn assert_quiet(&self, expected: usize, settle: Duration) {
        tokio::time::sleep(settle).await;
        assert_eq!(self.len(), expected, "unexpected extra notifications: {:?}", self.snapshot());
    }
}
