//! Observability seam.
//!
//! The library never logs through a global logger.  Components report what
//! happens to an injected [`BridgeObserver`]; the binary plugs in
//! `infrastructure::TracingObserver`, tests plug in recorders.
//!
//! Every method has an empty default body so implementors only override the
//! events they care about.

use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

use uuid::Uuid;

use super::link::LinkStatus;

pub trait BridgeObserver: Send + Sync {
    /// The inbound listener is bound and accepting.
    fn listening(&self, _addr: SocketAddr) {}

    /// A request without a usable WebSocket upgrade was answered with 400.
    fn request_rejected(&self, _reason: &str) {}

    /// The 101 response went out but the upgrade itself failed.
    fn upgrade_failed(&self, _error: &dyn Error) {}

    /// Transport failure on an accepted inbound socket, or in the listener.
    fn inbound_error(&self, _error: &dyn Error) {}

    /// An outbound link changed state.
    fn link_state_changed(&self, _url: &str, _status: LinkStatus) {}

    /// A dial or an open outbound socket failed.
    fn transport_error(&self, _url: &str, _error: &dyn Error) {}

    /// A reconnect dial will run after `delay`.
    fn reconnect_scheduled(&self, _url: &str, _attempt: u32, _delay: Duration) {}

    /// A link spent its attempt budget and stopped dialing.
    fn link_exhausted(&self, _url: &str) {}

    /// A frame arrived on the long-lived link.
    fn peer_message(&self, _payload: &str) {}

    /// A `fetch_var` exchange began on its own ephemeral link.
    fn fetch_started(&self, _request: Uuid, _name: &str) {}

    /// A `fetch_var` exchange received its reply.
    fn fetch_completed(&self, _request: Uuid, _elapsed: Duration) {}

    /// A `fetch_var` exchange hit its deadline.
    fn fetch_timed_out(&self, _request: Uuid, _name: &str, _deadline: Duration) {}
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BridgeObserver for NoopObserver {}
