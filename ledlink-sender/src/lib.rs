//! # ledlink-sender: LED frame sender
//!
//! Renders a built-in scene into a W×H raster at a fixed tick rate, diffs
//! each frame against the previous one and streams the changed pixels to
//! the bridge as binary WebSocket messages.
//!
//! While the bridge is unreachable ticks are skipped; with
//! `resync_on_connect` the first tick after every (re)connect sends the
//! whole frame.

pub mod config;
pub mod service;
