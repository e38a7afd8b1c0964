//! editor-bridge library crate.
//!
//! A relay between a host application and a companion editor process, both
//! speaking WebSocket.
//!
//! # Architecture
//!
//! ```text
//! Host application (WebSocket client)
//!         │ text frames
//!         ▼
//! [editor-bridge]
//!   ├── domain/           Envelope, BridgeConfig, LinkMachine, BridgeObserver
//!   ├── application/      Bridge: notify / eval_remote / fetch_var / close
//!   └── infrastructure/
//!         ├── inbound/    HTTP listener + upgrade (axum)
//!         ├── outbound/   reconnecting client link (tokio-tungstenite)
//!         └── tracing_observer/
//!         │ {"type": ..., "content": ...}
//!         ▼
//! Editor peer (WebSocket server on ws://127.0.0.1:<outbound_port>)
//! ```
//!
//! # Layer rules
//!
//! - `domain` performs no I/O and spawns nothing.
//! - `application` depends on `domain` and `infrastructure`.
//! - `infrastructure` owns every socket and every background task.

/// Domain layer: wire envelope, configuration, link state machine.
pub mod domain;

/// Application layer: the `Bridge` service.
pub mod application;

/// Infrastructure layer: inbound listener, outbound links, tracing observer.
pub mod infrastructure;

pub use application::{Bridge, BridgeError};
pub use domain::{BridgeConfig, BridgeObserver, ConnectionState, Envelope, EnvelopeKind, LinkStatus};
pub use infrastructure::{ConnectionError, MessageHandler, TracingObserver};
