//! Infrastructure layer for editor-bridge.
//!
//! Everything that touches a socket lives here:
//!
//! - `outbound`: the WebSocket client link to the editor peer and its
//!   reconnecting driver task (tokio-tungstenite)
//! - `inbound`: the HTTP listener the host connects to (axum)
//! - `tracing_observer`: the default observer, backed by `tracing`

pub mod inbound;
pub mod outbound;
pub mod tracing_observer;

pub use inbound::{InboundListener, MessageHandler};
pub use outbound::{Connection, ConnectionError, ConnectionEvent};
pub use tracing_observer::TracingObserver;
