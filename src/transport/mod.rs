//! Command handlers behind the transport layer.
//! The transport itself (HTTP server, heartbeat) lives outside of this crate,
//! it only forwards the parsed requests to the handlers here.
mod command;

pub use command::*;
