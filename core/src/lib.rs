//! API client core for the Roamly travel app.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern), and offers `AsyncClient` for
//! callers who want each operation as a single awaitable call over a
//! `Transport`.
//!
//! # Design
//! - `ApiClient` is stateless; it holds only its `ApiConfig`.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and every failure mode is testable without a
//!   server.
//! - `ApiError` keeps server rejections, unreadable payloads and transport
//!   failures apart.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod timestamp;
pub mod transport;
pub mod types;

pub use client::{ApiClient, HealthApp};
pub use config::ApiConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::AsyncClient;
pub use transport::Transport;
pub use types::{
    AuthTokens, ChatMessage, ChatRoom, Credentials, HealthStatus, LogoutRequest, MessageEnvelope,
    NewMessage, NewRoom,
};
