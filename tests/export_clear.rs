mod common;
use crate::common::{chat, dispatcher, dispatcher_with, init_tracing, text_of, ConfigBuilder, FailingLauncher, SETTLE};

use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use adminagent::facade::{DispatchError, Target, STATUS_INVALID};
use adminagent::notify::NotificationBody;
use adminagent::orders::OrderIdSet;
use adminagent::rpc::{execute, Request};
use serde_json::json;

type TestResult = Result<(), Box<dyn Error>>;

const WRITE_ARTIFACT: &str = "printf 'order {order}' > {out}/order_{order}.txt";
const ARTIFACT: &str = "{out}/order_{order}.txt";

fn orders(ids: &[u32]) -> OrderIdSet {
    OrderIdSet::try_from(ids.to_vec()).unwrap()
}

#[tokio::test]
async fn export_uploads_one_document_per_order() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path()).export(WRITE_ARTIFACT, ARTIFACT).build();
    let out = cfg.paths.out.clone();
    let (dispatcher, sent) = dispatcher(cfg);

    let started = dispatcher.export(chat(42), &orders(&[5, 9]))?;
    assert_eq!(started, 2);

    let mut docs: Vec<(PathBuf, String)> = sent
        .wait_for(2)
        .await
        .into_iter()
        .map(|n| match n.body {
            NotificationBody::Document { path, caption } => (path, caption),
            other => panic!("expected a document, got {other:?}"),
        })
        .collect();
    docs.sort();

    assert_eq!(
        docs,
        vec![
            (out.join("order_5.txt"), "Order export #5".to_string()),
            (out.join("order_9.txt"), "Order export #9".to_string()),
        ]
    );
    assert_eq!(std::fs::read_to_string(out.join("order_9.txt"))?, "order 9");
    sent.assert_quiet(2, SETTLE).await;
    Ok(())
}

#[tokio::test]
async fn export_skips_orders_that_fail_to_start() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path()).export(WRITE_ARTIFACT, ARTIFACT).build();
    let (dispatcher, sent) = dispatcher_with(cfg, FailingLauncher::new("order_7"));

    let started = dispatcher.export(chat(42), &orders(&[5, 7, 9]))?;
    assert_eq!(started, 2);

    let notes = sent.wait_for(2).await;
    assert!(notes.iter().all(|n| matches!(
        &n.body,
        NotificationBody::Document { caption, .. } if caption != "Order export #7"
    )));
    sent.assert_quiet(2, SETTLE).await;
    Ok(())
}

#[tokio::test]
async fn failed_export_sends_text_instead_of_document() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path())
        .export("echo no data for {order} >&2; exit 4", ARTIFACT)
        .build();
    let (dispatcher, sent) = dispatcher(cfg);

    dispatcher.export(chat(42), &orders(&[5]))?;

    let notes = sent.wait_for(1).await;
    assert_eq!(
        text_of(&notes[0]),
        "⚠️ Order export #5: exited with code 4\n```\nno data for 5\n```"
    );
    Ok(())
}

#[tokio::test]
async fn stale_artifact_is_removed_before_the_job_starts() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path()).export("exit 1", ARTIFACT).build();
    let stale = cfg.paths.out.join("order_5.txt");
    std::fs::write(&stale, "yesterday")?;
    let (dispatcher, sent) = dispatcher(cfg);

    dispatcher.export(chat(42), &orders(&[5]))?;
    assert!(!stale.exists());

    sent.wait_for(1).await;
    Ok(())
}

#[tokio::test]
async fn export_rejects_missing_or_empty_order_lists() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path()).export(WRITE_ARTIFACT, ARTIFACT).build();
    let (dispatcher, sent) = dispatcher(cfg);

    for orders in [None, Some(json!(null)), Some(json!([])), Some(json!([1, "x"])), Some(json!(5))] {
        let status = execute(&dispatcher, Request::Export { chat: 42, orders, reply_to: 0 }).await;
        assert_eq!(status, STATUS_INVALID);
    }

    let err = dispatcher.export(chat(0), &orders(&[1])).unwrap_err();
    assert!(matches!(err, DispatchError::Job(_)));

    sent.assert_quiet(0, SETTLE).await;
    Ok(())
}

#[tokio::test]
async fn export_status_is_the_number_of_started_jobs() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path()).export(WRITE_ARTIFACT, ARTIFACT).build();
    let (dispatcher, sent) = dispatcher(cfg);

    let status = execute(
        &dispatcher,
        Request::Export {
            chat: 42,
            orders: Some(json!([1, 2, 3])),
            reply_to: 0,
        },
    )
    .await;
    assert_eq!(status, 3);

    sent.wait_for(3).await;
    Ok(())
}

#[tokio::test]
async fn clear_passes_every_id_to_one_job() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path())
        .clear_cmd("echo clearing {orders}")
        .build();
    let (dispatcher, sent) = dispatcher(cfg);

    let handle = dispatcher.clear(chat(42), &orders(&[3, 1, 2]))?;
    assert!(handle.pid > 0);

    let notes = sent.wait_for(1).await;
    assert_eq!(text_of(&notes[0]), "✅ Clear orders\n```\nclearing 3 1 2\n```");
    sent.assert_quiet(1, SETTLE).await;
    Ok(())
}

#[tokio::test]
async fn clear_rejects_bad_order_lists() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path())
        .clear_cmd("echo clearing {orders}")
        .build();
    let (dispatcher, sent) = dispatcher(cfg);

    let status = execute(&dispatcher, Request::Clear { chat: 42, orders: Some(json!([])), reply_to: 0 }).await;
    assert_eq!(status, STATUS_INVALID);
    let status = execute(&dispatcher, Request::Clear { chat: 42, orders: Some(json!([-1])), reply_to: 0 }).await;
    assert_eq!(status, STATUS_INVALID);

    sent.assert_quiet(0, SETTLE).await;
    Ok(())
}

#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn rejected_order_lists_are_logged_as_warnings() -> TestResult {
    let sink = LogSink::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::tempdir()?;
    let (dispatcher, _sent) = dispatcher(ConfigBuilder::new(dir.path()).build());

    let status = execute(&dispatcher, Request::Export { chat: 42, orders: Some(json!("5,x")), reply_to: 0 }).await;
    assert_eq!(status, STATUS_INVALID);

    let logged = String::from_utf8(sink.0.lock().unwrap().clone())?;
    assert!(logged.contains("WARN"), "{logged}");
    assert!(logged.contains("order list rejected"), "{logged}");
    Ok(())
}

#[tokio::test]
async fn reports_answer_the_requesting_message() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path())
        .export(WRITE_ARTIFACT, ARTIFACT)
        .clear_cmd("echo clearing {orders}")
        .build();
    let (dispatcher, sent) = dispatcher(cfg);

    let started = execute(
        &dispatcher,
        Request::Export {
            chat: 42,
            orders: Some(json!([4, 6])),
            reply_to: 77,
        },
    )
    .await;
    assert_eq!(started, 2);
    dispatcher.clear(Target::reply(42, 78), &orders(&[1]))?;

    let notes = sent.wait_for(3).await;
    let mut replies: Vec<Option<u32>> = notes.iter().map(|n| n.reply_to).collect();
    replies.sort();
    assert_eq!(replies, vec![Some(77), Some(77), Some(78)]);
    Ok(())
}
