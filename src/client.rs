//! Session channel client
//!
//! Connects to the server's `/ws` endpoint and exposes the channel as a pair
//! of mpsc queues: outgoing `ClientMessage`s and incoming `ServerMessage`s.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use url::Url;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Derive the WebSocket URL from a server base URL
///
/// `http://host:3000` becomes `ws://host:3000/ws`; `https` maps to `wss`.
///
/// # Errors
///
/// Returns error if the URL is malformed or uses an unsupported scheme
pub fn session_url(server: &str) -> Result<Url> {
    let mut url =
        Url::parse(server).map_err(|e| Error::Config(format!("invalid server URL {server}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(Error::Config(format!("unsupported URL scheme: {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::Config(format!("cannot use scheme {scheme} for {server}")))?;

    let base = url.path().trim_end_matches('/');
    let path = if base.ends_with("/ws") {
        base.to_string()
    } else {
        format!("{base}/ws")
    };
    url.set_path(&path);
    Ok(url)
}

/// Connected session channel
pub struct SessionClient {
    tx: mpsc::Sender<ClientMessage>,
}

impl SessionClient {
    /// Connect to `server` and spawn the connection task
    ///
    /// The returned receiver yields server messages until the connection
    /// closes, then returns `None`.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the handshake fails
    pub async fn connect(server: &str) -> Result<(Self, mpsc::Receiver<ServerMessage>)> {
        let url = session_url(server)?;
        tracing::info!(url = %url, "connecting to session channel");

        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::Channel(format!("failed to connect to {url}: {e}")))?;

        let (tx, rx) = mpsc::channel::<ClientMessage>(32);
        let (incoming_tx, incoming_rx) = mpsc::channel::<ServerMessage>(32);

        tokio::spawn(async move {
            if let Err(e) = Self::handle_connection(stream, rx, incoming_tx).await {
                tracing::warn!(error = %e, "session channel closed with error");
            } else {
                tracing::info!("session channel closed");
            }
        });

        Ok((Self { tx }, incoming_rx))
    }

    /// Sender for outgoing messages, usable as a controller `Outbox`
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<ClientMessage> {
        self.tx.clone()
    }

    /// Queue a message for the server
    ///
    /// # Errors
    ///
    /// Returns error if the connection task has stopped
    pub async fn send(&self, message: ClientMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| Error::Channel("connection closed".to_string()))
    }

    async fn handle_connection(
        stream: WsStream,
        mut outgoing: mpsc::Receiver<ClientMessage>,
        incoming: mpsc::Sender<ServerMessage>,
    ) -> Result<()> {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                frame = read.next() => {
                    let Some(frame) = frame else { break };
                    let frame = frame.map_err(|e| Error::Channel(e.to_string()))?;
                    match frame {
                        Message::Text(text) => match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(message) => {
                                if incoming.send(message).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::debug!(error = %e, "ignoring unparseable frame"),
                        },
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                message = outgoing.recv() => {
                    let Some(message) = message else {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    };
                    let json = serde_json::to_string(&message)?;
                    write
                        .send(Message::Text(json.into()))
                        .await
                        .map_err(|e| Error::Channel(e.to_string()))?;
                }
            }
        }

        Ok(())
    }
}
