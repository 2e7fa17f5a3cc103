//! Fleetboard gateway control-plane client.
//!
//! Speaks the stateful, connection-per-call gateway protocol: every call
//! opens a fresh WebSocket, completes the challenge → connect → hello-ok
//! handshake, performs exactly one application round trip, and closes the
//! socket. Route handlers and polling hooks consume this crate; they never
//! manage connections themselves.
//!
//! # Example
//!
//! ```rust,ignore
//! use fleetboard_gateway::{GatewayClient, GatewayEndpoint};
//!
//! #[tokio::main]
//! async fn main() -> fleetboard_gateway::Result<()> {
//!     let endpoint = GatewayEndpoint::new("ws://gw.internal:9800/control")
//!         .with_token("agent-token");
//!     let client = GatewayClient::new(endpoint);
//!
//!     let sessions = client.sessions_list().await?;
//!     println!("sessions: {sessions}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handshake;
pub mod methods;
pub mod pairing;
pub mod protocol;

pub use client::{GatewayClient, GatewayEndpoint};
pub use config::ProtocolConfig;
pub use error::{GatewayError, Result};
pub use handshake::{CallDriver, Phase, Step};
pub use pairing::{check_pairing, request_pairing, PairingRequest, PairingStatus};
pub use protocol::{ErrorShape, Frame};
