//! Application layer for editor-bridge.
//!
//! Orchestrates the infrastructure pieces into the operations callers use:
//! `notify`, `eval_remote`, `fetch_var` and `close`.  It knows *what* to send
//! and over which link; how bytes move is the infrastructure layer's job.

pub mod bridge;

pub use bridge::{Bridge, BridgeError};
