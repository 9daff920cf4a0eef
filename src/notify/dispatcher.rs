// src/notify/dispatcher.rs

//! Notification queue and delivery loop.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::notify::message::{Notification, NotifyError};
use crate::notify::transport::Transport;
use crate::types::ReportMode;

/// Cloneable handle used by jobs to emit notifications.
///
/// Every `send_*` call validates its arguments, moves the notification into
/// the queue and returns; it never waits for delivery.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
    mode: ReportMode,
}

impl Notifier {
    /// Send a text report in the configured mode. `reply_to == 0` means no reply.
    pub fn send_report(
        &self,
        chat: u32,
        text: impl Into<String>,
        reply_to: u32,
    ) -> Result<(), NotifyError> {
        self.send_report_as(chat, text, self.mode, reply_to)
    }

    pub fn send_report_as(
        &self,
        chat: u32,
        text: impl Into<String>,
        mode: ReportMode,
        reply_to: u32,
    ) -> Result<(), NotifyError> {
        self.enqueue(Notification::text(chat, text, mode, reply_to)?)
    }

    /// Upload `path` as a document with `caption`.
    pub fn send_document(
        &self,
        chat: u32,
        path: impl Into<PathBuf>,
        caption: impl Into<String>,
        reply_to: u32,
    ) -> Result<(), NotifyError> {
        self.enqueue(Notification::document(chat, path, caption, reply_to)?)
    }

    pub fn enqueue(&self, notification: Notification) -> Result<(), NotifyError> {
        debug!(
            chat = notification.chat_id,
            mode = ?notification.mode(),
            "notification queued"
        );
        self.tx
            .send(notification)
            .map_err(|_| NotifyError::QueueClosed)
    }
}

/// Spawn the delivery loop.
///
/// Each queued notification gets its own Tokio task, so a slow or failing
/// delivery never holds up the queue or the caller. The loop ends once every
/// [`Notifier`] has been dropped; deliveries already started keep running.
pub fn spawn_dispatcher<T: Transport>(
    transport: T,
    mode: ReportMode,
) -> (Notifier, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

    let handle = tokio::spawn(async move {
        info!("notification dispatcher started");

        while let Some(notification) = rx.recv().await {
            let chat = notification.chat_id;
            let mode = notification.mode();
            let delivery = transport.deliver(notification);

            tokio::spawn(async move {
                match delivery.await {
                    Ok(d) if d.is_success() => {
                        debug!(chat, ?mode, status = d.status, "notification delivered");
                    }
                    Ok(d) => {
                        warn!(
                            chat,
                            ?mode,
                            status = d.status,
                            body = %d.body,
                            "endpoint rejected notification"
                        );
                    }
                    Err(e) => {
                        error!(chat, ?mode, error = %e, "notification delivery failed");
                    }
                }
            });
        }

        info!("notification dispatcher finished (channel closed)");
    });

    (Notifier { tx, mode }, handle)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::notify::transport::{Delivery, DeliveryFuture};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Notification>>>);

    impl Transport for Recorder {
        fn deliver(&self, notification: Notification) -> DeliveryFuture {
            let seen = Arc::clone(&self.0);
            Box::pin(async move {
                seen.lock().unwrap().push(notification);
                Ok(Delivery {
                    status: 200,
                    chunks: 0,
                    body: String::new(),
                })
            })
        }
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_transport() {
        let recorder = Recorder::default();
        let (notifier, handle) = spawn_dispatcher(recorder.clone(), ReportMode::Markdown);

        assert!(matches!(notifier.send_report(0, "x", 0), Err(NotifyError::MissingChat)));
        assert!(matches!(
            notifier.send_document(5, "", "cap", 0),
            Err(NotifyError::MissingDocument)
        ));
        notifier.send_report(5, "ok", 0).unwrap();

        drop(notifier);
        handle.await.unwrap();
        // The delivery task may still be running.
        for _ in 0..50 {
            if !recorder.0.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text_body(), Some("ok"));
    }

    #[tokio::test]
    async fn send_after_dispatcher_stops_reports_closed_queue() {
        let (notifier, handle) = spawn_dispatcher(Recorder::default(), ReportMode::Markdown);
        handle.abort();
        let _ = handle.await;
        assert!(matches!(
            notifier.send_report(1, "late", 0),
            Err(NotifyError::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn send_report_uses_configured_mode() {
        let recorder = Recorder::default();
        let (notifier, _handle) = spawn_dispatcher(recorder.clone(), ReportMode::Html);
        notifier.send_report(3, "<b>x</b>", 0).unwrap();

        for _ in 0..50 {
            if !recorder.0.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(recorder.0.lock().unwrap()[0].mode(), ReportMode::Html);
    }
}
