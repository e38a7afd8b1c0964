//! Outbound WebSocket link to the editor peer.
//!
//! A [`Connection`] is a handle; the socket itself lives in a *driver* task
//! spawned by [`Connection::connect`].  The driver owns three things:
//!
//! 1. the WebSocket (read and write halves),
//! 2. the [`LinkMachine`] that decides whether to redial,
//! 3. the receiving end of the command channel.
//!
//! Every state transition therefore happens on one task.  Callers never touch
//! the socket: `send` and `close` are commands answered by the driver, and the
//! current [`LinkStatus`] is published through a `watch` channel.
//!
//! # Driver phases
//!
//! ```text
//! dial ──ok──▶ pump (read frames + answer commands) ──closed──┐
//!  │                                                          │
//!  └──failed──────────────────────────────────────────────────┤
//!                                                             ▼
//!                                 LinkMachine::closed ──Retry──▶ back_off ──▶ dial
//!                                                     └─Exhausted─▶ idle
//! ```
//!
//! Outside `pump`, a `Send` command is answered with
//! [`ConnectionError::NotConnected`]; a `Close` command (or dropping the
//! handle) ends the driver from any phase.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};

use crate::domain::{
    BridgeObserver, CloseOutcome, ConnectionState, LinkMachine, LinkStatus, ReconnectPolicy,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors returned by [`Connection`] operations.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The link is not in the `Connected` state (still dialing, waiting to
    /// retry, exhausted, closed, or never started).
    #[error("WebSocket is not connected")]
    NotConnected,

    /// `connect` was called while a driver for this handle is still running.
    #[error("connection is already started")]
    AlreadyStarted,

    /// Writing the frame to the socket failed.
    #[error("WebSocket transport error: {0}")]
    Transport(#[from] WsError),
}

/// What a connection reports to the party that called `connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The socket opened (first open or a successful reconnect).
    Connected,
    /// A text frame arrived; the payload is passed through untouched.
    Message(String),
}

enum Command {
    Send {
        data: String,
        reply: oneshot::Sender<Result<(), ConnectionError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to one outbound link.
///
/// Dropping the handle closes the link, like [`Connection::close`].
pub struct Connection {
    url: String,
    policy: ReconnectPolicy,
    observer: Arc<dyn BridgeObserver>,
    /// Shared with every driver this handle starts, so subscribers survive
    /// a close/connect cycle.
    status: Arc<watch::Sender<LinkStatus>>,
    commands: Option<mpsc::UnboundedSender<Command>>,
}

impl Connection {
    /// Creates a handle in the `Disconnected` state. Nothing is dialed yet.
    pub fn new(
        url: impl Into<String>,
        policy: ReconnectPolicy,
        observer: Arc<dyn BridgeObserver>,
    ) -> Self {
        let (status, _) = watch::channel(LinkMachine::new(policy).status());
        Self {
            url: url.into(),
            policy,
            observer,
            status: Arc::new(status),
            commands: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Snapshot of the current state and attempt counter.
    pub fn status(&self) -> LinkStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> ConnectionState {
        self.status().state
    }

    /// A receiver that sees every status published for this handle, across
    /// any number of `connect` calls.
    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.subscribe()
    }

    fn is_running(&self) -> bool {
        self.commands.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Spawns the driver and starts dialing.
    ///
    /// Opens and inbound text frames are delivered on `events`.  A failed
    /// first dial is not an error here; it goes through the reconnect policy
    /// like any other close.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::AlreadyStarted`] if the previous driver has not been
    /// closed.  At most one socket exists per handle.
    pub fn connect(
        &mut self,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Result<(), ConnectionError> {
        if self.is_running() {
            return Err(ConnectionError::AlreadyStarted);
        }

        let machine = LinkMachine::new(self.policy);
        self.status.send_replace(machine.status());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            url: self.url.clone(),
            machine,
            status: Arc::clone(&self.status),
            observer: Arc::clone(&self.observer),
            events,
            commands: commands_rx,
        };
        tokio::spawn(driver.run());

        self.commands = Some(commands_tx);
        Ok(())
    }

    /// Writes one text frame.
    ///
    /// There is no queueing and no retry: the frame is written now or the
    /// call fails.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::NotConnected`] unless the link is `Connected`.
    /// - [`ConnectionError::Transport`] if the socket write fails.
    pub async fn send(&self, data: impl Into<String>) -> Result<(), ConnectionError> {
        let Some(commands) = self.commands.as_ref() else {
            return Err(ConnectionError::NotConnected);
        };

        let (reply, outcome) = oneshot::channel();
        commands
            .send(Command::Send {
                data: data.into(),
                reply,
            })
            .map_err(|_| ConnectionError::NotConnected)?;

        outcome.await.unwrap_or(Err(ConnectionError::NotConnected))
    }

    /// Closes the socket (if open) and cancels any pending redial.
    ///
    /// Returns once the driver has moved to `Disconnected` and stopped taking
    /// commands, so `connect` may be called again right away.  Calling it
    /// again, or on a handle that was never connected, does nothing.
    pub async fn close(&self) {
        let Some(commands) = self.commands.as_ref() else {
            return;
        };

        let (reply, done) = oneshot::channel();
        if commands.send(Command::Close { reply }).is_ok() {
            let _ = done.await;
        }
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

enum Flow {
    Continue,
    Stop,
}

enum Dial {
    Open(WsStream),
    Failed(WsError),
    Stop,
}

enum Step {
    Frame(Option<Result<WsMessage, WsError>>),
    Command(Option<Command>),
}

struct Driver {
    url: String,
    machine: LinkMachine,
    status: Arc<watch::Sender<LinkStatus>>,
    observer: Arc<dyn BridgeObserver>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            self.machine.begin_connect();
            self.publish();

            match self.dial().await {
                Dial::Stop => return,
                Dial::Failed(error) => self.observer.transport_error(&self.url, &error),
                Dial::Open(socket) => {
                    self.machine.opened();
                    self.publish();
                    // Nobody listening is fine; the link still works for sends.
                    let _ = self.events.send(ConnectionEvent::Connected);

                    if let Flow::Stop = self.pump(socket).await {
                        return;
                    }
                }
            }

            match self.machine.closed() {
                CloseOutcome::Retry { attempt, delay } => {
                    self.publish();
                    self.observer.reconnect_scheduled(&self.url, attempt, delay);
                    if let Flow::Stop = self.back_off(delay).await {
                        return;
                    }
                }
                CloseOutcome::Exhausted => {
                    self.publish();
                    self.observer.link_exhausted(&self.url);
                    self.idle().await;
                    return;
                }
            }
        }
    }

    /// Dials the peer while still answering commands.
    async fn dial(&mut self) -> Dial {
        let attempt = connect_async(self.url.clone());
        tokio::pin!(attempt);

        loop {
            let command = tokio::select! {
                result = &mut attempt => {
                    return match result {
                        Ok((socket, _response)) => Dial::Open(socket),
                        Err(error) => Dial::Failed(error),
                    };
                }
                command = self.commands.recv() => command,
            };

            if let Flow::Stop = self.answer_offline(command) {
                return Dial::Stop;
            }
        }
    }

    /// Runs an open socket until it closes (`Continue`) or the link is shut
    /// down (`Stop`).
    async fn pump(&mut self, socket: WsStream) -> Flow {
        let (mut sink, mut stream) = socket.split();

        loop {
            let step = tokio::select! {
                frame = stream.next() => Step::Frame(frame),
                command = self.commands.recv() => Step::Command(command),
            };

            match step {
                Step::Frame(Some(Ok(WsMessage::Text(text)))) => {
                    let _ = self.events.send(ConnectionEvent::Message(text));
                }
                Step::Frame(Some(Ok(WsMessage::Close(_)))) | Step::Frame(None) => {
                    return Flow::Continue;
                }
                // Binary, ping and pong frames carry no envelope.
                Step::Frame(Some(Ok(_))) => {}
                Step::Frame(Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed))) => {
                    return Flow::Continue;
                }
                Step::Frame(Some(Err(error))) => {
                    self.observer.transport_error(&self.url, &error);
                    return Flow::Continue;
                }
                Step::Command(Some(Command::Send { data, reply })) => {
                    let result = sink
                        .send(WsMessage::Text(data))
                        .await
                        .map_err(ConnectionError::from);
                    let _ = reply.send(result);
                }
                Step::Command(Some(Command::Close { reply })) => {
                    let _ = sink.close().await;
                    self.shut_down();
                    let _ = reply.send(());
                    return Flow::Stop;
                }
                Step::Command(None) => {
                    let _ = sink.close().await;
                    self.shut_down();
                    return Flow::Stop;
                }
            }
        }
    }

    /// Waits out the fixed retry interval.
    async fn back_off(&mut self, delay: Duration) -> Flow {
        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);

        loop {
            let command = tokio::select! {
                () = &mut timer => return Flow::Continue,
                command = self.commands.recv() => command,
            };

            if let Flow::Stop = self.answer_offline(command) {
                return Flow::Stop;
            }
        }
    }

    /// Exhausted: no more dials, but sends must still fail loudly.
    async fn idle(&mut self) {
        loop {
            let command = self.commands.recv().await;
            if let Flow::Stop = self.answer_offline(command) {
                return;
            }
        }
    }

    fn answer_offline(&mut self, command: Option<Command>) -> Flow {
        match command {
            Some(Command::Send { reply, .. }) => {
                let _ = reply.send(Err(ConnectionError::NotConnected));
                Flow::Continue
            }
            Some(Command::Close { reply }) => {
                self.shut_down();
                let _ = reply.send(());
                Flow::Stop
            }
            None => {
                self.shut_down();
                Flow::Stop
            }
        }
    }

    /// Closing the command queue first makes the handle see the driver as
    /// stopped before any `Close` caller is answered.
    fn shut_down(&mut self) {
        self.commands.close();
        self.machine.shut_down();
        self.publish();
    }

    fn publish(&self) {
        let status = self.machine.status();
        self.status.send_replace(status);
        self.observer.link_state_changed(&self.url, status);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
