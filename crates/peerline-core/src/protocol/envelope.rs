//! Envelope types (JSON).
//!
//! One envelope is one line on the wire. Outbound envelopes carry a command
//! tag plus an opaque payload; inbound lines are either a reply to some
//! request (`status` key present) or a server-initiated push (`command` key
//! present, no `status`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{PeerlineError, Result};

/// Outbound request envelope.
///
/// `id` is the correlation id stamped by the persistent transport; replies
/// echoing it are matched back to their request. The payload is opaque to the
/// transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Command tag (e.g. "login"). Never empty on the wire.
    pub command: String,
    /// Correlation id, omitted when the envelope was never sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Command-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl CommandEnvelope {
    pub fn new(command: impl Into<String>, data: Value) -> Self {
        Self {
            command: command.into(),
            id: None,
            data,
        }
    }
}

/// Reply outcome. Anything the server sends that is not literally
/// "success" (in any case) is an error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

impl<'de> Deserialize<'de> for ReplyStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case("success") {
            Ok(ReplyStatus::Success)
        } else {
            Ok(ReplyStatus::Error)
        }
    }
}

/// Inbound reply envelope.
///
/// Canonical shape: the payload lives under `data` and may be any JSON value
/// (the live protocol uses both objects and arrays). Legacy replies that
/// flatten payload fields at the top level are folded into `data` by the
/// codec, so callers only ever see this shape.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyEnvelope {
    pub status: ReplyStatus,
    pub message: Option<String>,
    pub data: Option<Value>,
    /// Correlation id echoed by the server, when it echoes one.
    pub id: Option<u64>,
}

impl ReplyEnvelope {
    pub fn is_success(&self) -> bool {
        self.status == ReplyStatus::Success
    }

    /// Map an error-status reply to `PeerlineError::Application`, handing the
    /// payload through on success. An error reply is a normal decoded value,
    /// not a transport fault; this is for callers that want `?` flow.
    pub fn into_application_result(self) -> Result<Option<Value>> {
        match self.status {
            ReplyStatus::Success => Ok(self.data),
            ReplyStatus::Error => Err(PeerlineError::Application(
                self.message.unwrap_or_else(|| "unspecified error".into()),
            )),
        }
    }

    /// Decode the payload into a typed value.
    pub fn decode_data<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let data = self
            .data
            .clone()
            .ok_or_else(|| PeerlineError::MalformedEnvelope("reply has no data".into()))?;
        serde_json::from_value(data)
            .map_err(|e| PeerlineError::MalformedEnvelope(format!("reply data: {e}")))
    }
}

/// Unsolicited server-initiated envelope. Structurally a command envelope
/// flowing the other way; there is no request correlating to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    /// Notification kind (e.g. "refresh-users").
    pub command: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl PushEnvelope {
    /// Decode the notification payload into a typed value.
    pub fn decode_data<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let data = self
            .data
            .clone()
            .ok_or_else(|| PeerlineError::MalformedEnvelope("push has no data".into()))?;
        serde_json::from_value(data)
            .map_err(|e| PeerlineError::MalformedEnvelope(format!("push data: {e}")))
    }
}

/// Classification of one received line.
#[derive(Debug, Clone)]
pub enum Inbound {
    Reply(ReplyEnvelope),
    Push(PushEnvelope),
}
