//! Two-step pairing flow for approving a new control node.
//!
//! Pairing is two RPC calls composed by the caller: `node.pair.request`
//! returns a request id, then the caller polls `node.pair.verify` until the
//! id shows up approved (with an issued credential) or drops out of the
//! pending list. Poll cadence and termination belong to the caller; this
//! module only interprets individual poll payloads.

use crate::client::GatewayClient;
use crate::{GatewayError, Result};
use serde_json::Value;
use tracing::debug;

/// An accepted pairing request awaiting operator approval.
#[derive(Debug, Clone)]
pub struct PairingRequest {
    pub request_id: String,
}

/// Outcome of one pairing poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingStatus {
    /// Still in the gateway's pending list.
    Pending,
    /// Approved; the gateway issued a credential for the new node.
    Approved { token: String },
    /// Gone from both lists: the request was rejected or expired.
    Rejected,
}

/// Submit a pairing request with a human-readable label and requested scopes.
pub async fn request_pairing(
    client: &GatewayClient,
    label: &str,
    scopes: &[String],
) -> Result<PairingRequest> {
    let payload = client.node_pair_request(label, scopes).await?;
    let request_id = payload
        .get("requestId")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            GatewayError::Protocol("node.pair.request payload missing requestId".into())
        })?
        .to_string();

    debug!(%request_id, label, "pairing requested");
    Ok(PairingRequest { request_id })
}

/// Run one poll of the pairing state for a previously submitted request.
pub async fn check_pairing(client: &GatewayClient, request_id: &str) -> Result<PairingStatus> {
    let payload = client.node_pair_verify().await?;

    if let Some(entry) = approved_entry(&payload, request_id) {
        let token = entry
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GatewayError::Protocol("approved pairing entry missing token".into())
            })?
            .to_string();
        return Ok(PairingStatus::Approved { token });
    }

    if is_pending(&payload, request_id) {
        return Ok(PairingStatus::Pending);
    }

    Ok(PairingStatus::Rejected)
}

fn approved_entry<'a>(payload: &'a Value, request_id: &str) -> Option<&'a Value> {
    payload
        .get("approved")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|entry| entry.get("requestId").and_then(Value::as_str) == Some(request_id))
}

fn is_pending(payload: &Value, request_id: &str) -> bool {
    payload
        .get("pending")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|entry| match entry {
            // Gateways report pending entries either as bare ids or objects.
            Value::String(id) => id == request_id,
            other => other.get("requestId").and_then(Value::as_str) == Some(request_id),
        })
}
