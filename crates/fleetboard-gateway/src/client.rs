//! WebSocket RPC call engine.
//!
//! One call, one connection: `call()` opens a fresh socket, drives the
//! handshake, sends exactly one application request, awaits the matching
//! response, and closes the socket. There is no pooling and no multiplexing;
//! concurrent calls each own their socket and timer and share nothing.
//! Upstream callers are polling hooks on 15-30s intervals, so connection
//! affinity buys nothing here.

use crate::config::ProtocolConfig;
use crate::handshake::{CallDriver, Step};
use crate::protocol::Frame;
use crate::{GatewayError, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use url::Url;

/// Immutable per-call connection parameters.
#[derive(Debug, Clone)]
pub struct GatewayEndpoint {
    /// WebSocket URL of the gateway, e.g. `ws://gw.internal:9800/control`.
    pub url: String,
    /// Opaque bearer credential, if the gateway requires one.
    pub token: Option<String>,
}

impl GatewayEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Client for one gateway endpoint. Cheap to clone and construct; holds no
/// connection state between calls.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    endpoint: GatewayEndpoint,
    timeout: Duration,
}

impl GatewayClient {
    pub fn new(endpoint: GatewayEndpoint) -> Self {
        Self {
            endpoint,
            timeout: ProtocolConfig::CALL_TIMEOUT,
        }
    }

    /// Override the per-call deadline (default 30s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Invoke one method on the gateway and return its result payload.
    ///
    /// The whole call — connect, handshake, round trip — runs under a single
    /// deadline. When it fires, the in-flight future is dropped, which tears
    /// the socket down on the spot.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        match tokio::time::timeout(self.timeout, self.call_inner(method, params)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        }
    }

    async fn call_inner(&self, method: &str, params: Value) -> Result<Value> {
        let url = self.connect_url()?;
        let (mut socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| GatewayError::Transport(format!("failed to open socket: {e}")))?;

        debug!(method, url = %self.endpoint.url, "gateway call connected");

        let mut driver = CallDriver::new(method, params, self.endpoint.token.as_deref());

        let outcome = loop {
            let message = match socket.next().await {
                Some(Ok(message)) => message,
                // The loop breaks as soon as the driver settles, so the
                // stream ending here always means an unsettled call.
                Some(Err(e)) => break Err(GatewayError::Transport(format!("socket error: {e}"))),
                None => {
                    break match driver.on_close() {
                        Step::Settle(outcome) => outcome,
                        _ => Err(GatewayError::Transport(
                            "connection closed before response".into(),
                        )),
                    };
                }
            };

            let step = match message {
                Message::Text(text) => match Frame::decode(&text) {
                    Some(frame) => driver.on_frame(frame),
                    None => {
                        debug!(method, "dropping unparseable message");
                        Step::Ignore
                    }
                },
                Message::Close(_) => driver.on_close(),
                // Ping/pong are answered by the transport; binary is noise.
                _ => Step::Ignore,
            };

            match step {
                Step::Send(frame) => {
                    let text = frame.encode()?;
                    socket
                        .send(Message::Text(text))
                        .await
                        .map_err(|e| GatewayError::Transport(format!("socket send failed: {e}")))?;
                }
                Step::Ignore => {}
                Step::Settle(outcome) => break outcome,
            }
        };

        // Best-effort close; dropping the stream is the backstop.
        let _ = socket.close(None).await;

        debug!(method, ok = outcome.is_ok(), "gateway call settled");
        outcome
    }

    /// Build the connection URL, carrying the credential as a query parameter
    /// in addition to the `auth.token` field in the connect body. Some
    /// gateway implementations only inspect one of the two channels.
    fn connect_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint.url).map_err(|e| {
            GatewayError::Transport(format!("invalid gateway url {}: {e}", self.endpoint.url))
        })?;
        if let Some(token) = &self.endpoint.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }
}
