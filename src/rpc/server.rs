// src/rpc/server.rs

use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::facade::{DispatchError, Dispatcher, Target};
use crate::orders::OrderIdSet;

use super::protocol::{parse_request, Request, Response};

/// Bind the control socket, replacing a stale socket file left by a previous
/// run. Fails with `AddrInUse` if another agent is still listening.
pub fn bind(path: &Path) -> io::Result<UnixListener> {
    if path.exists() {
        if std::os::unix::net::UnixStream::connect(path).is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AddrInUse,
                format!("{} is in use by a running agent", path.display()),
            ));
        }
        debug!(socket = %path.display(), "removing stale socket");
        std::fs::remove_file(path)?;
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let listener = UnixListener::bind(path)?;
    info!(socket = %path.display(), "rpc socket listening");
    Ok(listener)
}

/// Accept connections until the listener fails. Each connection is served on
/// its own task, so a slow client never blocks the others.
pub async fn serve(listener: UnixListener, dispatcher: Arc<Dispatcher>) -> io::Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &dispatcher).await {
                warn!(error = %e, "rpc connection closed with error");
            }
        });
    }
}

async fn handle_connection(stream: UnixStream, dispatcher: &Dispatcher) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(dispatcher, &line).await;
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
    }

    debug!("rpc client disconnected");
    Ok(())
}

/// Decode, execute and answer one request line.
pub async fn handle_line(dispatcher: &Dispatcher, line: &str) -> Response {
    let (id, request) = parse_request(line);
    match request {
        Ok(request) => {
            debug!(method = request.method(), "rpc request");
            Response::status(id, execute(dispatcher, request).await)
        }
        Err(e) => {
            warn!(error = %e, "rpc request rejected");
            Response::error(id, e)
        }
    }
}

/// Run `request` and map the outcome to its status code.
///
/// `run`, `pull` and `clear` return the child pid, `export` the number of
/// jobs started, and `tail` returns 0 once its report has been queued.
pub async fn execute(dispatcher: &Dispatcher, request: Request) -> i32 {
    let outcome = match request {
        Request::Run {
            command,
            chat,
            reply_to,
        } => dispatcher
            .run_command(&command, Target::reply(chat, reply_to))
            .map(|h| pid_status(h.pid)),
        Request::Tail {
            count,
            chat,
            reply_to,
        } => dispatcher
            .tail(count, Target::reply(chat, reply_to))
            .await
            .map(|_| 0),
        Request::Pull { chat, reply_to } => dispatcher
            .pull(Target::reply(chat, reply_to))
            .map(|h| pid_status(h.pid)),
        Request::Export {
            chat,
            orders,
            reply_to,
        } => OrderIdSet::decode(orders.as_ref())
            .map_err(DispatchError::from)
            .and_then(|set| dispatcher.export(Target::reply(chat, reply_to), &set))
            .map(|started| i32::try_from(started).unwrap_or(i32::MAX)),
        Request::Clear {
            chat,
            orders,
            reply_to,
        } => OrderIdSet::decode(orders.as_ref())
            .map_err(DispatchError::from)
            .and_then(|set| dispatcher.clear(Target::reply(chat, reply_to), &set))
            .map(|h| pid_status(h.pid)),
    };

    match outcome {
        Ok(status) => status,
        Err(e @ DispatchError::Orders(_)) => {
            warn!(error = %e, status = e.status_code(), "order list rejected");
            e.status_code()
        }
        Err(e) => {
            debug!(error = %e, status = e.status_code(), "request failed");
            e.status_code()
        }
    }
}

fn pid_status(pid: u32) -> i32 {
    i32::try_from(pid).unwrap_or(i32::MAX)
}
