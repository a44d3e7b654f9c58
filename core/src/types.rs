//! DTOs for the Roamly REST API.
//!
//! # Design
//! Field names match the wire's snake_case keys (`sender_email`,
//! `created_at`), so encode and decode are symmetric without renames. These
//! types are defined independently from the mock-server crate; integration
//! tests catch schema drift between the two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp;

/// Bearer tokens returned by a successful login. Opaque to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

/// Request payload for register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Generic acknowledgement / error body. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageEnvelope {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// A single message inside a chat room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_email: String,
    pub content: String,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A chat room with its participants and messages, oldest message first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChatRoom {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub participants: Vec<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request payload for posting a message to a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub content: String,
}

/// Request payload for creating a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoom {
    pub name: String,
}

/// Request payload for logout; the refresh token is blacklisted server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub refresh: String,
}

/// Body of the per-app health endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub ok: bool,
    pub app: String,
}
