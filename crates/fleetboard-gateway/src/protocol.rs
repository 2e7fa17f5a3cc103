//! Gateway wire protocol types and the text-frame codec.
//!
//! A gateway connection exchanges UTF-8 JSON text frames of three kinds,
//! discriminated by a `type` tag:
//!
//! ```text
//! {"type":"req","id":"...","method":"sessions.list","params":{}}
//! {"type":"res","id":"...","ok":true,"payload":{...}}
//! {"type":"event","event":"connect.challenge","payload":{...},"seq":1}
//! ```
//!
//! Decoding is deliberately lenient: anything that is not valid JSON or does
//! not carry a recognized kind tag is treated as "no frame" rather than an
//! error, so a single garbled or diagnostic message from a heterogeneous
//! gateway implementation cannot fail an in-flight call.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single wire frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// An application or handshake request, correlated by caller-generated id.
    #[serde(rename = "req")]
    Request {
        id: String,
        method: String,
        #[serde(default)]
        params: Value,
    },

    /// The response to a request, carrying the matching correlation id.
    #[serde(rename = "res")]
    Response {
        id: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorShape>,
    },

    /// An unsolicited event. Only `connect.challenge` is meaningful to this
    /// layer; everything else (liveness pings, session broadcasts) is noise.
    #[serde(rename = "event")]
    Event {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },
}

/// Structured error reported by the gateway inside a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorShape {
    #[serde(default = "default_error_code")]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

fn default_error_code() -> i64 {
    -1
}

impl Frame {
    /// Build a request frame with a fresh correlation id.
    pub fn request(method: impl Into<String>, params: Value) -> Self {
        Frame::Request {
            id: Uuid::new_v4().to_string(),
            method: method.into(),
            params,
        }
    }

    /// Serialize this frame to its text form.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::GatewayError::Protocol(format!("failed to encode frame: {e}")))
    }

    /// Parse a text frame. Returns `None` for anything that is not valid
    /// structured data with a recognized kind tag; never errors.
    pub fn decode(text: &str) -> Option<Frame> {
        serde_json::from_str(text).ok()
    }
}
