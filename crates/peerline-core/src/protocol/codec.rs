//! Line codec: one JSON envelope per newline-terminated line.
//!
//! Decoding is a structured `serde_json` parse into the envelope types, with
//! the tolerant contract of the wire format preserved as validation rules:
//! - missing optional fields map to `None`;
//! - bare-token booleans, numbers, and UUID strings are ordinary JSON values;
//! - a reply-shaped line with no `status` key at all is `MalformedEnvelope`;
//! - legacy replies carrying payload fields at the top level are folded
//!   under `data`.

use serde_json::{Map, Value};

use crate::error::{PeerlineError, Result};
use crate::protocol::envelope::{
    CommandEnvelope, Inbound, PushEnvelope, ReplyEnvelope, ReplyStatus,
};

/// Encode an outbound envelope as a single line (no terminator).
///
/// JSON string escaping covers embedded quotes, so the output is one line by
/// construction. Rejects an empty command tag.
pub fn encode_command(envelope: &CommandEnvelope) -> Result<String> {
    if envelope.command.is_empty() {
        return Err(PeerlineError::MalformedEnvelope(
            "outbound envelope has empty command".into(),
        ));
    }
    serde_json::to_string(envelope)
        .map_err(|e| PeerlineError::MalformedEnvelope(format!("encode: {e}")))
}

/// Decode one received line into a reply or a push.
///
/// A line with a `status` key is a reply; a line with a `command` key and no
/// `status` is a push; anything else is malformed.
pub fn decode_inbound(line: &str) -> Result<Inbound> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| PeerlineError::MalformedEnvelope(format!("invalid json: {e}")))?;

    let Value::Object(fields) = value else {
        return Err(PeerlineError::MalformedEnvelope(
            "envelope is not a json object".into(),
        ));
    };

    if fields.contains_key("status") {
        return Ok(Inbound::Reply(decode_reply(fields)?));
    }
    if fields.contains_key("command") {
        return Ok(Inbound::Push(decode_push(fields)?));
    }
    Err(PeerlineError::MalformedEnvelope(
        "envelope has neither status nor command".into(),
    ))
}

fn decode_reply(mut fields: Map<String, Value>) -> Result<ReplyEnvelope> {
    let status = match fields.remove("status") {
        Some(Value::String(s)) => {
            if s.eq_ignore_ascii_case("success") {
                ReplyStatus::Success
            } else {
                ReplyStatus::Error
            }
        }
        Some(other) => {
            return Err(PeerlineError::MalformedEnvelope(format!(
                "status is not a string: {other}"
            )))
        }
        None => {
            return Err(PeerlineError::MalformedEnvelope(
                "reply has no status".into(),
            ))
        }
    };

    let message = match fields.remove("message") {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };

    // A u64 id is the echoed correlation id. Anything else (a flattened
    // legacy payload's UUID id, say) is payload and must survive the fold.
    let id = fields.get("id").and_then(Value::as_u64);
    if id.is_some() {
        fields.remove("id");
    }

    let data = match fields.remove("data") {
        Some(Value::Null) | None => None,
        Some(v) => Some(v),
    };

    // Legacy replies flatten payload fields next to status/message. Fold the
    // leftovers under data so callers see one canonical shape.
    let data = match data {
        Some(v) => Some(v),
        None if !fields.is_empty() => {
            tracing::debug!(keys = fields.len(), "folding flat legacy reply into data");
            Some(Value::Object(fields))
        }
        None => None,
    };

    Ok(ReplyEnvelope {
        status,
        message,
        data,
        id,
    })
}

fn decode_push(mut fields: Map<String, Value>) -> Result<PushEnvelope> {
    let command = match fields.remove("command") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => {
            return Err(PeerlineError::MalformedEnvelope(
                "push command is missing or empty".into(),
            ))
        }
    };

    let data = match fields.remove("data") {
        Some(Value::Null) | None => None,
        Some(v) => Some(v),
    };

    Ok(PushEnvelope { command, data })
}
