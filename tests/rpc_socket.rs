mod common;
use crate::common::{dispatcher, init_tracing, text_of, with_timeout, ConfigBuilder};

use std::error::Error;
use std::sync::Arc;

use adminagent::rpc;
use adminagent::types::OutputMode;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

type TestResult = Result<(), Box<dyn Error>>;

struct Client {
    lines: tokio::io::Lines<BufReader<tokio::net::unix::OwnedReadHalf>>,
    writer: tokio::net::unix::OwnedWriteHalf,
}

impl Client {
    async fn connect(path: &std::path::Path) -> std::io::Result<Self> {
        let (r, w) = UnixStream::connect(path).await?.into_split();
        Ok(Self {
            lines: BufReader::new(r).lines(),
            writer: w,
        })
    }

    async fn call(&mut self, request: Value) -> Result<Value, Box<dyn Error>> {
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        let reply = self.lines.next_line().await?.ok_or("connection closed")?;
        Ok(serde_json::from_str(&reply)?)
    }
}

#[tokio::test]
async fn requests_round_trip_over_the_socket() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path())
        .command_with("hello", Some("Hello"), "echo hi", OutputMode::Text)
        .build();
    let socket = cfg.rpc.socket.clone();
    let (dispatcher, sent) = dispatcher(cfg);

    let listener = rpc::bind(&socket)?;
    tokio::spawn(rpc::serve(listener, Arc::new(dispatcher)));

    let mut client = Client::connect(&socket).await?;

    let reply = with_timeout(client.call(json!({
        "id": 1, "method": "run", "params": {"command": "hello", "chat": 42}
    })))
    .await?;
    assert_eq!(reply["id"], 1);
    assert!(reply["status"].as_i64().unwrap() > 0);

    let reply = client
        .call(json!({"id": 2, "method": "run", "params": ["nope", 42]}))
        .await?;
    assert_eq!(reply, json!({"id": 2, "status": 0}));

    let reply = client
        .call(json!({"id": 3, "method": "export", "params": {"chat": 42, "orders": []}}))
        .await?;
    assert_eq!(reply, json!({"id": 3, "status": -22}));

    let reply = client.call(json!({"id": 4, "method": "reboot"})).await?;
    assert_eq!(reply["id"], 4);
    assert!(reply["error"].as_str().unwrap().contains("reboot"));

    let notes = sent.wait_for(1).await;
    assert_eq!(text_of(&notes[0]), "✅ Hello\n```\nhi\n```");
    Ok(())
}

#[tokio::test]
async fn malformed_line_gets_an_error_and_the_connection_survives() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigBuilder::new(dir.path()).build();
    let socket = cfg.rpc.socket.clone();
    let (dispatcher, _sent) = dispatcher(cfg);

    let listener = rpc::bind(&socket)?;
    tokio::spawn(rpc::serve(listener, Arc::new(dispatcher)));

    let mut client = Client::connect(&socket).await?;
    client.writer.write_all(b"{not json\n").await?;
    let reply: Value = serde_json::from_str(&client.lines.next_line().await?.unwrap())?;
    assert_eq!(reply["id"], Value::Null);
    assert!(reply["error"].is_string());

    let reply = client
        .call(json!({"id": 9, "method": "clear", "params": {"chat": 1}}))
        .await?;
    assert_eq!(reply, json!({"id": 9, "status": -22}));
    Ok(())
}

#[tokio::test]
async fn stale_socket_file_is_replaced() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let socket = dir.path().join("run/agent.sock");
    std::fs::create_dir_all(socket.parent().unwrap())?;
    drop(std::os::unix::net::UnixListener::bind(&socket)?);
    assert!(socket.exists());

    let _listener = rpc::bind(&socket)?;
    Ok(())
}

#[tokio::test]
async fn live_socket_is_not_stolen() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let socket = dir.path().join("agent.sock");

    let _first = rpc::bind(&socket)?;
    let err = rpc::bind(&socket).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
    Ok(())
}
