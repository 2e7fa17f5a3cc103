//! Centralized configuration for the gateway protocol layer.

use std::time::Duration;

/// Protocol-level constants for gateway connections.
pub struct ProtocolConfig;

impl ProtocolConfig {
    /// Minimum protocol version this client can speak.
    pub const VERSION_MIN: u32 = 3;
    /// Maximum protocol version this client can speak.
    pub const VERSION_MAX: u32 = 3;

    /// Per-call deadline. The only admission control in the RPC layer;
    /// retries, if desired, are layered by the caller.
    pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

    /// Fixed client identity descriptor sent in the connect request.
    pub const CLIENT_ID: &'static str = "fleetboard-control";
    pub const CLIENT_MODE: &'static str = "backend";
    /// Role requested during connect.
    pub const ROLE: &'static str = "operator";

    /// The one event name this layer acts on.
    pub const CHALLENGE_EVENT: &'static str = "connect.challenge";
    /// Payload type marker expected in a successful connect response.
    pub const HELLO_OK: &'static str = "hello-ok";
}
