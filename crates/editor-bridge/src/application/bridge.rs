//! The bridge service: the public API of this crate.
//!
//! A [`Bridge`] owns two things for its whole lifetime:
//!
//! - the inbound listener the host connects to, and
//! - one long-lived outbound [`Connection`] to the editor peer, used by
//!   [`Bridge::notify`] and [`Bridge::eval_remote`].
//!
//! [`Bridge::fetch_var`] is a request/response exchange over a channel that
//! has no correlation ids.  To keep its reply from mixing with unrelated
//! traffic it never uses the long-lived link: each call dials its own
//! ephemeral connection, and the first frame on that connection *is* the
//! reply.
//!
//! ```text
//!                 notify / eval_remote
//! caller ──▶ Bridge ───────────────────▶ long-lived Connection ──▶ peer
//!              │
//!              └── fetch_var ──▶ ephemeral Connection ──▶ peer
//!                                     ▲                    │
//!                                     └──── first frame ◀──┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use uuid::Uuid;

use crate::domain::{BridgeConfig, BridgeObserver, Envelope, LinkStatus, ProtocolError};
use crate::infrastructure::{
    Connection, ConnectionError, ConnectionEvent, InboundListener, MessageHandler, TracingObserver,
};

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors returned by [`Bridge`] operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The inbound listener could not bind its address.
    #[error("failed to bind inbound listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A send on an outbound link failed; passed through unchanged.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// `fetch_var` got no reply before its deadline.
    #[error("timed out after {0:?} waiting for a reply")]
    Timeout(Duration),

    /// An envelope could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

// ── Bridge ────────────────────────────────────────────────────────────────────

pub struct Bridge {
    config: BridgeConfig,
    listener: InboundListener,
    link: Connection,
    observer: Arc<dyn BridgeObserver>,
}

impl Bridge {
    /// Binds the inbound listener and starts dialing the peer.
    ///
    /// The peer does not need to be up: the long-lived link retries according
    /// to `config.retry_interval` and `config.max_attempts`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Bind`] if the listener cannot bind.
    pub async fn start(
        config: BridgeConfig,
        handler: MessageHandler,
        observer: Arc<dyn BridgeObserver>,
    ) -> Result<Self, BridgeError> {
        let addr = config.inbound_addr();
        let listener = InboundListener::bind(addr, handler, Arc::clone(&observer))
            .await
            .map_err(|source| BridgeError::Bind { addr, source })?;
        observer.listening(listener.local_addr());

        let mut link = Connection::new(
            config.outbound_url(),
            config.reconnect_policy(),
            Arc::clone(&observer),
        );
        let (events, peer_events) = mpsc::unbounded_channel();
        link.connect(events)?;
        tokio::spawn(report_peer_events(peer_events, Arc::clone(&observer)));

        Ok(Self {
            config,
            listener,
            link,
            observer,
        })
    }

    /// [`Bridge::start`] with a [`TracingObserver`] named after `config.app_name`.
    pub async fn start_with_tracing(
        config: BridgeConfig,
        handler: MessageHandler,
    ) -> Result<Self, BridgeError> {
        let observer = Arc::new(TracingObserver::new(config.app_name.clone()));
        Self::start(config, handler, observer).await
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Address the inbound listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Status of the long-lived link.
    pub fn link_status(&self) -> LinkStatus {
        self.link.status()
    }

    /// `false` once the inbound listener has stopped serving.
    pub fn is_listening(&self) -> bool {
        !self.listener.is_stopped()
    }

    /// Asks the peer to display `text`.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::NotConnected`] (wrapped) when the long-lived link is
    /// not open, or a transport error from the write.
    pub async fn notify(&self, text: &str) -> Result<(), BridgeError> {
        self.send_shared(Envelope::notify(text)).await
    }

    /// Asks the peer to evaluate `code`.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::notify`].
    pub async fn eval_remote(&self, code: &str) -> Result<(), BridgeError> {
        self.send_shared(Envelope::eval(code)).await
    }

    async fn send_shared(&self, envelope: Envelope) -> Result<(), BridgeError> {
        let frame = envelope.encode()?;
        self.link.send(frame).await?;
        Ok(())
    }

    /// Asks the peer for the value of variable `name` and returns the first
    /// frame it sends back, untouched.
    ///
    /// The whole exchange (dial, send, wait for the reply) must finish within
    /// `config.fetch_timeout`.  If the ephemeral link drops and reopens inside
    /// the deadline, the request is sent again.  The ephemeral connection is closed before this
    /// returns, whatever the outcome, so a second frame from the peer is never
    /// seen.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Timeout`] if no reply arrived in time.
    /// - [`BridgeError::Connection`] if the request frame could not be written.
    pub async fn fetch_var(&self, name: &str) -> Result<String, BridgeError> {
        let request = Uuid::new_v4();
        let frame = Envelope::fetch_var(name).encode()?;
        let deadline = self.config.fetch_timeout;
        let started = Instant::now();
        self.observer.fetch_started(request, name);

        let mut link = Connection::new(
            self.config.outbound_url(),
            self.config.reconnect_policy(),
            Arc::clone(&self.observer),
        );
        let (events, mut replies) = mpsc::unbounded_channel();
        link.connect(events)?;

        let outcome = timeout(deadline, exchange(&link, &mut replies, frame)).await;
        link.close().await;

        match outcome {
            Ok(Ok(payload)) => {
                self.observer.fetch_completed(request, started.elapsed());
                Ok(payload)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_elapsed) => {
                self.observer.fetch_timed_out(request, name, deadline);
                Err(BridgeError::Timeout(deadline))
            }
        }
    }

    /// Stops the inbound listener and closes the long-lived link.
    ///
    /// In-flight `fetch_var` calls own their connections and are not affected.
    pub async fn close(&self) {
        self.listener.shutdown();
        self.link.close().await;
    }
}

/// Sends the request each time the ephemeral link opens and returns the
/// first frame.  A reopen means the peer dropped the earlier socket, so the
/// request is written again on the new one.  Runs under the caller's deadline.
async fn exchange(
    link: &Connection,
    replies: &mut mpsc::UnboundedReceiver<ConnectionEvent>,
    frame: String,
) -> Result<String, ConnectionError> {
    while let Some(event) = replies.recv().await {
        match event {
            ConnectionEvent::Connected => match link.send(frame.clone()).await {
                // Closed again before the write; the next open resends.
                Ok(()) | Err(ConnectionError::NotConnected) => {}
                Err(e) => return Err(e),
            },
            ConnectionEvent::Message(payload) => return Ok(payload),
        }
    }
    Err(ConnectionError::NotConnected)
}

/// Drains the long-lived link's events.  Ends when the link is closed.
async fn report_peer_events(
    mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
    observer: Arc<dyn BridgeObserver>,
) {
    while let Some(event) = events.recv().await {
        if let ConnectionEvent::Message(payload) = event {
            observer.peer_message(&payload);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
