//! Error types for gateway calls.
//!
//! Callers need to distinguish "the gateway is unreachable" from "the gateway
//! rejected the call" to decide whether to retry, surface the failure to a
//! human, or treat it as terminal. All four kinds travel in one enum so route
//! handlers can branch on `code()` and `is_retryable()`.

use crate::protocol::ErrorShape;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Main error type for gateway RPC calls.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Could not open the socket, socket-level error, or premature close.
    #[error("transport error: {0}")]
    Transport(String),

    /// The handshake violated the expected sequence or payload shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The gateway returned a structured failure for the call itself.
    /// Code, message, and details are passed through verbatim.
    #[error("gateway error {code}: {message}")]
    Application {
        code: i64,
        message: String,
        details: Option<Value>,
        retryable: Option<bool>,
    },

    /// No terminal state was reached before the per-call deadline.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// Error code surfaced to callers: the server's own code for application
    /// errors, `-1` for everything that failed on this side of the wire.
    pub fn code(&self) -> i64 {
        match self {
            GatewayError::Application { code, .. } => *code,
            _ => -1,
        }
    }

    /// Check if this error should trigger a retry.
    ///
    /// Transport and timeout failures are retryable; protocol violations are
    /// not. Application errors honor the gateway's `retryable` hint when
    /// present and default to not retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) | GatewayError::Timeout(_) => true,
            GatewayError::Protocol(_) => false,
            GatewayError::Application { retryable, .. } => retryable.unwrap_or(false),
        }
    }
}

impl From<ErrorShape> for GatewayError {
    fn from(shape: ErrorShape) -> Self {
        GatewayError::Application {
            code: shape.code,
            message: shape.message,
            details: shape.details,
            retryable: shape.retryable,
        }
    }
}
