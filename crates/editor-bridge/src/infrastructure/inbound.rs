//! Inbound listener: the host application connects here.
//!
//! Every request, whatever its path, is either a WebSocket upgrade or a
//! mistake:
//!
//! - upgrade → `101 Switching Protocols`, then each text frame on the socket
//!   is handed to the [`MessageHandler`] verbatim;
//! - anything else → `400 Bad Request` with a short text body.  The handler
//!   is never called.
//!
//! Socket errors are reported to the observer and end only that socket; the
//! accept loop keeps running until [`InboundListener::shutdown`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::BridgeObserver;

/// Receives every text frame the host sends, unmodified.
pub type MessageHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Body of the response to a non-upgrade request.
pub const NOT_A_WEBSOCKET_REQUEST: &str = "Not a WebSocket request";

#[derive(Clone)]
struct ListenerState {
    handler: MessageHandler,
    observer: Arc<dyn BridgeObserver>,
}

/// A running inbound listener.
pub struct InboundListener {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    server: JoinHandle<()>,
}

impl InboundListener {
    /// Binds `addr` and starts serving in a background task.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the address cannot be bound (port in use,
    /// missing permission).
    pub async fn bind(
        addr: SocketAddr,
        handler: MessageHandler,
        observer: Arc<dyn BridgeObserver>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let state = ListenerState {
            handler,
            observer: Arc::clone(&observer),
        };
        let app = Router::new().fallback(upgrade_or_reject).with_state(state);

        let (shutdown, mut stop) = watch::channel(false);
        let server = tokio::spawn(async move {
            let serving = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = stop.wait_for(|stopped| *stopped).await;
            });
            if let Err(e) = serving.await {
                observer.inbound_error(&e);
            }
        });

        Ok(Self {
            local_addr,
            shutdown,
            server,
        })
    }

    /// The bound address; differs from the requested one when port 0 was used.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting new requests.  Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// `true` once the serve task has ended.
    pub fn is_stopped(&self) -> bool {
        self.server.is_finished()
    }
}

impl Drop for InboundListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn upgrade_or_reject(
    State(state): State<ListenerState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => {
            let observer = Arc::clone(&state.observer);
            ws.on_failed_upgrade(move |error| observer.upgrade_failed(&error))
                .on_upgrade(move |socket| forward_frames(socket, state))
        }
        Err(rejection) => {
            state.observer.request_rejected(&rejection.body_text());
            (StatusCode::BAD_REQUEST, NOT_A_WEBSOCKET_REQUEST).into_response()
        }
    }
}

async fn forward_frames(mut socket: WebSocket, state: ListenerState) {
    while let Some(frame) = socket.recv().await {
        match frame {
            Ok(Message::Text(text)) => (state.handler)(text.as_str().to_owned()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                state.observer.inbound_error(&e);
                break;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
