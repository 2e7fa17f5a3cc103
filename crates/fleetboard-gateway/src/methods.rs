//! Typed per-method wrappers over [`GatewayClient::call`].
//!
//! Mechanical facade: each wrapper names one wire method and shapes its
//! parameters. Results are the gateway's raw payloads; the pairing flow in
//! `pairing` adds typing where the payload shape matters.

use crate::client::GatewayClient;
use crate::Result;
use serde_json::{json, Value};

impl GatewayClient {
    // Session lifecycle

    pub async fn sessions_list(&self) -> Result<Value> {
        self.call("sessions.list", json!({})).await
    }

    pub async fn sessions_get(&self, session_key: &str) -> Result<Value> {
        self.call("sessions.get", json!({ "sessionKey": session_key }))
            .await
    }

    /// Create a session from a full session spec (name, templates, runtime
    /// options); the gateway validates the shape.
    pub async fn sessions_create(&self, spec: Value) -> Result<Value> {
        self.call("sessions.create", spec).await
    }

    pub async fn sessions_delete(&self, session_key: &str) -> Result<Value> {
        self.call("sessions.delete", json!({ "sessionKey": session_key }))
            .await
    }

    pub async fn sessions_reset(&self, session_key: &str) -> Result<Value> {
        self.call("sessions.reset", json!({ "sessionKey": session_key }))
            .await
    }

    pub async fn sessions_bootstrap(&self, session_key: &str) -> Result<Value> {
        self.call("sessions.bootstrap", json!({ "sessionKey": session_key }))
            .await
    }

    pub async fn sessions_update_templates(
        &self,
        session_key: &str,
        templates: Value,
    ) -> Result<Value> {
        self.call(
            "sessions.update_templates",
            json!({ "sessionKey": session_key, "templates": templates }),
        )
        .await
    }

    pub async fn sessions_rotate_token(&self, session_key: &str) -> Result<Value> {
        self.call("sessions.rotate_token", json!({ "sessionKey": session_key }))
            .await
    }

    // Messaging

    pub async fn messages_send(&self, session_key: &str, text: &str) -> Result<Value> {
        self.call(
            "messages.send",
            json!({ "sessionKey": session_key, "text": text }),
        )
        .await
    }

    // Runtime and commands

    pub async fn runtime_info(&self) -> Result<Value> {
        self.call("runtime.info", json!({})).await
    }

    pub async fn commands_execute(&self, session_key: &str, command: &str) -> Result<Value> {
        self.call(
            "commands.execute",
            json!({ "sessionKey": session_key, "command": command }),
        )
        .await
    }

    // Skill management

    pub async fn skills_install(&self, name: &str, source: Value) -> Result<Value> {
        self.call("skills.install", json!({ "name": name, "source": source }))
            .await
    }

    pub async fn skills_uninstall(&self, name: &str) -> Result<Value> {
        self.call("skills.uninstall", json!({ "name": name })).await
    }

    pub async fn skills_list(&self) -> Result<Value> {
        self.call("skills.list", json!({})).await
    }

    pub async fn skills_sync_pack(&self, pack: Value) -> Result<Value> {
        self.call("skills.sync_pack", json!({ "pack": pack })).await
    }

    // Tasks

    pub async fn tasks_list(&self) -> Result<Value> {
        self.call("tasks.list", json!({})).await
    }

    // Pairing (raw calls; see `pairing` for the composed flow)

    pub async fn node_pair_request(&self, label: &str, scopes: &[String]) -> Result<Value> {
        self.call(
            "node.pair.request",
            json!({ "label": label, "scopes": scopes }),
        )
        .await
    }

    pub async fn node_pair_verify(&self) -> Result<Value> {
        self.call("node.pair.verify", json!({})).await
    }
}
