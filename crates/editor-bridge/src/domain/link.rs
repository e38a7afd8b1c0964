//! The reconnect state machine of an outbound link.
//!
//! [`LinkMachine`] holds the tagged [`ConnectionState`] and the attempt counter.
//! It performs no I/O: the connection driver in
//! `infrastructure::outbound` feeds it socket events (`opened`, `closed`, ...)
//! and acts on what it returns.  Because the machine is owned by exactly one
//! driver task, a retry timer and a manual `connect` can never race on the
//! counter.
//!
//! ```text
//!                 begin_connect            opened
//! Disconnected ────────────────▶ Connecting ──────▶ Connected
//!                                  ▲    │               │
//!                   begin_connect  │    │ closed        │ closed
//!                                  │    ▼               ▼
//!                              Reconnecting ◀──── (attempts < max)
//!                                                       │
//!                                        (attempts == max)
//!                                                       ▼
//!                                                   Exhausted
//! ```
//!
//! `shut_down` moves any state to `Disconnected`.

use std::time::Duration;

use super::config::ReconnectPolicy;

/// Lifecycle state of an outbound link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket and no pending dial. Initial state, and the state after `close`.
    Disconnected,
    /// A dial is in flight.
    Connecting,
    /// The socket is open; `send` is allowed.
    Connected,
    /// Waiting out the retry interval before the next dial.
    Reconnecting,
    /// The attempt budget is spent; no further dials will happen.
    Exhausted,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of a link, published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: ConnectionState,
    /// Reconnect attempts made since the last successful open.
    pub attempts: u32,
}

/// What the driver must do after a close event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Dial again after `delay`. `attempt` is 1-based.
    Retry { attempt: u32, delay: Duration },
    /// Stop dialing for good.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct LinkMachine {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
}

impl LinkMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn status(&self) -> LinkStatus {
        LinkStatus {
            state: self.state,
            attempts: self.attempts,
        }
    }

    /// Only a `Connected` link accepts writes.
    pub fn can_send(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// A dial is starting.
    pub fn begin_connect(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// The socket opened; the attempt budget is refilled.
    pub fn opened(&mut self) {
        self.state = ConnectionState::Connected;
        self.attempts = 0;
    }

    /// The socket closed or the dial failed.
    ///
    /// Spends one attempt if any are left, otherwise exhausts the link.
    /// `attempts` never exceeds `policy.max_attempts`.
    pub fn closed(&mut self) -> CloseOutcome {
        if self.attempts < self.policy.max_attempts {
            self.attempts += 1;
            self.state = ConnectionState::Reconnecting;
            CloseOutcome::Retry {
                attempt: self.attempts,
                delay: self.policy.retry_interval,
            }
        } else {
            self.state = ConnectionState::Exhausted;
            CloseOutcome::Exhausted
        }
    }

    /// Explicit close: no further dials until the next `begin_connect`.
    pub fn shut_down(&mut self) {
        self.state = ConnectionState::Disconnected;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
