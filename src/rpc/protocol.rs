// src/rpc/protocol.rs

//! Wire format.
//!
//! ```json
//! {"id": 1, "method": "export", "params": {"chat": 42, "orders": [5, 7, 9]}}
//! {"id": 1, "status": 3}
//! ```
//!
//! `params` may also be positional, in the order the fields are listed on
//! [`Request`] (e.g. `"params": ["geos", 42]` for `run`). Every method takes
//! an optional trailing `reply_to` message id; the job's report then answers
//! that message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed request: {0}")]
    Json(#[source] serde_json::Error),

    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error("invalid params for '{method}': {source}")]
    Params {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A decoded request. `orders` stays raw until the façade validates it.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Run { command: String, chat: u32, reply_to: u32 },
    Tail { count: i32, chat: u32, reply_to: u32 },
    Pull { chat: u32, reply_to: u32 },
    Export { chat: u32, orders: Option<Value>, reply_to: u32 },
    Clear { chat: u32, orders: Option<Value>, reply_to: u32 },
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Request::Run { .. } => "run",
            Request::Tail { .. } => "tail",
            Request::Pull { .. } => "pull",
            Request::Export { .. } => "export",
            Request::Clear { .. } => "clear",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
struct RunParams {
    command: String,
    chat: u32,
    #[serde(default)]
    reply_to: u32,
}

#[derive(Deserialize)]
struct TailParams {
    count: i32,
    chat: u32,
    #[serde(default)]
    reply_to: u32,
}

#[derive(Deserialize)]
struct PullParams {
    chat: u32,
    #[serde(default)]
    reply_to: u32,
}

#[derive(Deserialize)]
struct OrdersParams {
    chat: u32,
    #[serde(default)]
    orders: Option<Value>,
    #[serde(default)]
    reply_to: u32,
}

/// Reply line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn status(id: Value, status: i32) -> Self {
        Self {
            id,
            status: Some(status),
            error: None,
        }
    }

    pub fn error(id: Value, error: impl ToString) -> Self {
        Self {
            id,
            status: None,
            error: Some(error.to_string()),
        }
    }
}

/// Decode one request line. The id is returned even when the params are bad,
/// so the error reply can be correlated.
pub fn parse_request(line: &str) -> (Value, Result<Request, ProtocolError>) {
    let envelope: Envelope = match serde_json::from_str(line) {
        Ok(e) => e,
        Err(e) => return (Value::Null, Err(ProtocolError::Json(e))),
    };

    let Envelope { id, method, params } = envelope;
    let request = decode_params(&method, params);
    (id, request)
}

fn decode_params(method: &str, params: Value) -> Result<Request, ProtocolError> {
    let bad = |source| ProtocolError::Params {
        method: method.to_string(),
        source,
    };

    let request = match method {
        "run" => {
            let p: RunParams = serde_json::from_value(params).map_err(bad)?;
            Request::Run {
                command: p.command,
                chat: p.chat,
                reply_to: p.reply_to,
            }
        }
        "tail" => {
            let p: TailParams = serde_json::from_value(params).map_err(bad)?;
            Request::Tail {
                count: p.count,
                chat: p.chat,
                reply_to: p.reply_to,
            }
        }
        "pull" => {
            let p: PullParams = serde_json::from_value(params).map_err(bad)?;
            Request::Pull {
                chat: p.chat,
                reply_to: p.reply_to,
            }
        }
        "export" => {
            let p: OrdersParams = serde_json::from_value(params).map_err(bad)?;
            Request::Export {
                chat: p.chat,
                orders: p.orders,
                reply_to: p.reply_to,
            }
        }
        "clear" => {
            let p: OrdersParams = serde_json::from_value(params).map_err(bad)?;
            Request::Clear {
                chat: p.chat,
                orders: p.orders,
                reply_to: p.reply_to,
            }
        }
        other => return Err(ProtocolError::UnknownMethod(other.to_string())),
    };

    Ok(request)
}
