//! Per-profile daemon: framed RPC protocol, session server, client stub
//! and lifecycle manager.

pub mod client;
pub mod manager;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use manager::{DaemonInfo, Manager};
pub use protocol::{Request, Response, StatusResult, TabInfo};
