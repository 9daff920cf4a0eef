// src/rpc/mod.rs

//! Inbound RPC boundary.
//!
//! Requests arrive as newline-delimited JSON on a Unix domain socket. Each
//! line names one of the façade operations; the reply carries the `i32`
//! status of that operation. The socket layer only accepts or rejects work;
//! job outcomes go to the chat.

pub mod protocol;
pub mod server;

pub use protocol::{parse_request, ProtocolError, Request, Response};
pub use server::{bind, execute, handle_line, serve};
