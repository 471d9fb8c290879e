//! Network connections that carry encoded messages to the bridge.

pub mod connection;

pub use connection::{ReconnectPolicy, WsConnection};
