//! [`BridgeObserver`] that turns every event into a `tracing` record.
//!
//! Each record carries the configured application name in the `app` field so
//! several bridges can share one log stream.

use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{BridgeObserver, ConnectionState, LinkStatus};

#[derive(Debug, Clone)]
pub struct TracingObserver {
    app_name: String,
}

impl TracingObserver {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl BridgeObserver for TracingObserver {
    fn listening(&self, addr: SocketAddr) {
        info!(app = %self.app_name, "inbound listener on {addr}");
    }

    fn request_rejected(&self, reason: &str) {
        debug!(app = %self.app_name, "rejected non-WebSocket request: {reason}");
    }

    fn upgrade_failed(&self, error: &dyn Error) {
        warn!(app = %self.app_name, "WebSocket upgrade failed: {error}");
    }

    fn inbound_error(&self, error: &dyn Error) {
        warn!(app = %self.app_name, "inbound WebSocket error: {error}");
    }

    fn link_state_changed(&self, url: &str, status: LinkStatus) {
        match status.state {
            ConnectionState::Connected => info!(app = %self.app_name, "connected to {url}"),
            state => debug!(
                app = %self.app_name,
                attempts = status.attempts,
                "link {url} is {state}"
            ),
        }
    }

    fn transport_error(&self, url: &str, error: &dyn Error) {
        debug!(app = %self.app_name, "transport error on {url}: {error}");
    }

    fn reconnect_scheduled(&self, url: &str, attempt: u32, delay: Duration) {
        info!(
            app = %self.app_name,
            "reconnecting to {url} in {delay:?} (attempt {attempt})"
        );
    }

    fn link_exhausted(&self, url: &str) {
        warn!(app = %self.app_name, "giving up on {url}: reconnect attempts exhausted");
    }

    fn peer_message(&self, payload: &str) {
        info!(app = %self.app_name, "received from peer: {payload}");
    }

    fn fetch_started(&self, request: Uuid, name: &str) {
        debug!(app = %self.app_name, %request, "fetching variable {name}");
    }

    fn fetch_completed(&self, request: Uuid, elapsed: Duration) {
        debug!(app = %self.app_name, %request, "fetch answered in {elapsed:?}");
    }

    fn fetch_timed_out(&self, request: Uuid, name: &str, deadline: Duration) {
        warn!(
            app = %self.app_name,
            %request,
            "timed out after {deadline:?} waiting for variable {name}"
        );
    }
}
