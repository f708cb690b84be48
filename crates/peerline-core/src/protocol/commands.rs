//! Command tags and typed payloads.
//!
//! The transport layer treats payloads as opaque JSON; the types here cover
//! only the authentication flow and the user records the server returns,
//! which the client itself needs. Wire field names (`username`, `nombre`,
//! `is_connected`) are the protocol and are kept verbatim. Channel and
//! messaging payloads stay opaque `Value`s shaped by the business layer.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol::envelope::CommandEnvelope;

/// Request command tags understood by the server.
pub const LOGIN: &str = "login";
pub const REGISTER: &str = "register";
pub const LIST_USERS: &str = "list-users";
pub const CREATE_CHANNEL: &str = "create-channel";
pub const SEND_MESSAGE_USER: &str = "send-message-user";
pub const INVITE_TO_CHANNEL: &str = "invite-to-channel";

/// Push tags the server initiates.
pub const REFRESH_USERS: &str = "refresh-users";

/// Login request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

/// Register request payload. Absent optionals go out as empty strings,
/// matching what the server expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub ip: String,
}

/// One user record as the server returns it (login reply data, list-users
/// reply entries, refresh-users push entries). Every field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_connected: bool,
}

pub fn login(email: &str, password: &str) -> CommandEnvelope {
    CommandEnvelope::new(LOGIN, json!({ "email": email, "password": password }))
}

pub fn register(data: &RegisterData) -> CommandEnvelope {
    CommandEnvelope::new(
        REGISTER,
        json!({
            "username": data.username,
            "email": data.email,
            "password": data.password,
            "photo": data.photo,
            "ip": data.ip,
        }),
    )
}

/// The server expects an empty data object here, not an absent one.
pub fn list_users() -> CommandEnvelope {
    CommandEnvelope::new(LIST_USERS, json!({}))
}

pub fn create_channel(data: Value) -> CommandEnvelope {
    CommandEnvelope::new(CREATE_CHANNEL, data)
}

pub fn send_message_user(data: Value) -> CommandEnvelope {
    CommandEnvelope::new(SEND_MESSAGE_USER, data)
}

pub fn invite_to_channel(data: Value) -> CommandEnvelope {
    CommandEnvelope::new(INVITE_TO_CHANNEL, data)
}
