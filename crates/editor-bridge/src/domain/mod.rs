//! Domain layer for editor-bridge.
//!
//! Pure types with no dependency on sockets, tasks or the async runtime:
//!
//! - the wire envelope and its codec,
//! - the reconnect state machine of an outbound link,
//! - configuration,
//! - the observer trait every component reports to.

pub mod config;
pub mod envelope;
pub mod link;
pub mod observer;

pub use config::{BridgeConfig, ReconnectPolicy};
pub use envelope::{Envelope, EnvelopeKind, ProtocolError};
pub use link::{CloseOutcome, ConnectionState, LinkMachine, LinkStatus};
pub use observer::{BridgeObserver, NoopObserver};
