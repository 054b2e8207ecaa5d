//! WebSocket transport.
//!
//! Each socket runs in its own task. The app talks to it through a
//! [`SocketHandle`] and hears back through an event channel, one
//! [`SocketEvent`] per open/message/error/close, in arrival order.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::protocol::{CloseRequest, OutboundMessage};

/// How long to wait for the server to answer our close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Open,
    Message(String),
    Error(String),
    /// Always the last event of a socket, whatever the cause.
    Closed { code: Option<u16>, reason: String },
}

#[derive(Debug)]
enum Command {
    Send(String),
    Close(Option<CloseRequest>),
}

/// Sending side of a running socket task. Dropping every handle closes the
/// socket.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SocketHandle {
    /// Queue a chat message as a JSON text frame.
    pub fn send(&self, message: &OutboundMessage) -> Result<()> {
        let text = message.encode()?;
        self.send_text(text)
    }

    pub fn send_text(&self, text: String) -> Result<()> {
        self.tx
            .send(Command::Send(text))
            .map_err(|_| ClientError::NotConnected)
    }

    /// True once the socket task has finished and dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Start the closing handshake. `None` sends a close frame with no code.
    /// A `Closed` event follows either way.
    pub fn close(&self, request: Option<CloseRequest>) {
        if self.tx.send(Command::Close(request)).is_err() {
            debug!("close requested on finished socket");
        }
    }
}

/// Open `url` in a background task.
pub fn spawn(url: String) -> (SocketHandle, mpsc::UnboundedReceiver<SocketEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_socket(url, cmd_rx, event_tx));
    (SocketHandle { tx: cmd_tx }, event_rx)
}

fn close_frame(request: Option<CloseRequest>) -> Option<CloseFrame<'static>> {
    request.map(|r| CloseFrame {
        code: CloseCode::from(r.code),
        reason: r.reason.into(),
    })
}

async fn run_socket(
    url: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    // The receiver may already be gone; nothing to do about it then.
    let emit = |event: SocketEvent| {
        let _ = events.send(event);
    };

    let ws = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            emit(SocketEvent::Error(e.to_string()));
            emit(SocketEvent::Closed {
                code: None,
                reason: String::new(),
            });
            return;
        }
    };
    emit(SocketEvent::Open);

    let (mut ws_sink, mut ws_stream) = ws.split();
    let mut close_code: Option<u16> = None;
    let mut close_reason = String::new();
    let mut close_deadline: Option<tokio::time::Instant> = None;
    let mut commands_open = true;

    loop {
        tokio::select! {
            cmd = commands.recv(), if commands_open => {
                match cmd {
                    Some(Command::Send(text)) => {
                        debug!(len = text.len(), "sending frame");
                        if let Err(e) = ws_sink.send(WsMessage::Text(text)).await {
                            emit(SocketEvent::Error(e.to_string()));
                            break;
                        }
                    }
                    Some(Command::Close(request)) => {
                        if close_deadline.is_none() {
                            if let Err(e) = ws_sink.send(WsMessage::Close(close_frame(request))).await {
                                debug!(error = %e, "close frame not sent");
                                break;
                            }
                            close_deadline = Some(tokio::time::Instant::now() + CLOSE_TIMEOUT);
                        }
                    }
                    None => {
                        commands_open = false;
                        if close_deadline.is_none() {
                            let _ = ws_sink.send(WsMessage::Close(None)).await;
                            close_deadline = Some(tokio::time::Instant::now() + CLOSE_TIMEOUT);
                        }
                    }
                }
            }

            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => emit(SocketEvent::Message(text)),
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        emit(SocketEvent::Message(String::from_utf8_lossy(&bytes).into_owned()));
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        if let Some(frame) = frame {
                            close_code = Some(u16::from(frame.code));
                            close_reason = frame.reason.into_owned();
                        }
                        debug!(code = ?close_code, reason = %close_reason, "close frame received");
                    }
                    Some(Ok(_)) => {} // ping / pong
                    Some(Err(WsError::ConnectionClosed)) | None => break,
                    Some(Err(e)) => {
                        emit(SocketEvent::Error(e.to_string()));
                        break;
                    }
                }
            }

            _ = sleep_until(close_deadline) => {
                warn!("server did not finish the closing handshake in time");
                break;
            }
        }
    }

    emit(SocketEvent::Closed {
        code: close_code,
        reason: close_reason,
    });
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
