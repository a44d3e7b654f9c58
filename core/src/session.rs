//! Async operations: construct, send, handle in one call.
//!
//! `AsyncClient` pairs the stateless `ApiClient` with a `Transport`. It holds
//! no session state of its own; tokens are passed in by the caller on every
//! call. Dropping a returned future aborts its exchange.

use tracing::debug;

use crate::client::{ApiClient, HealthApp};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{AuthTokens, ChatMessage, ChatRoom, Credentials, HealthStatus};

#[derive(Debug, Clone)]
pub struct AsyncClient<T = reqwest::Client> {
    api: ApiClient,
    transport: T,
}

impl AsyncClient<reqwest::Client> {
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(ApiClient::new(base_url), reqwest::Client::new())
    }

    /// Client configured from `ROAMLY_API_BASE_URL`, see `ApiConfig::from_env`.
    pub fn from_env() -> Self {
        Self::with_transport(ApiClient::with_config(ApiConfig::from_env()), reqwest::Client::new())
    }
}

impl<T: Transport> AsyncClient<T> {
    pub fn with_transport(api: ApiClient, transport: T) -> Self {
        Self { api, transport }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "received response");
        Ok(response)
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let request = self.api.build_register(&Credentials::new(email, password))?;
        self.api.parse_register(self.exchange(request).await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, ApiError> {
        let request = self.api.build_login(&Credentials::new(email, password))?;
        self.api.parse_login(self.exchange(request).await?)
    }

    pub async fn logout(&self, tokens: &AuthTokens) -> Result<(), ApiError> {
        let request = self.api.build_logout(&tokens.refresh, &tokens.access)?;
        self.api.parse_logout(self.exchange(request).await?)
    }

    pub async fn health(&self, app: HealthApp) -> Result<HealthStatus, ApiError> {
        let request = self.api.build_health(app)?;
        self.api.parse_health(self.exchange(request).await?)
    }

    pub async fn fetch_chat_rooms(&self, access_token: &str) -> Result<Vec<ChatRoom>, ApiError> {
        let request = self.api.build_fetch_chat_rooms(access_token)?;
        self.api.parse_fetch_chat_rooms(self.exchange(request).await?)
    }

    pub async fn fetch_messages(&self, room_id: i64, access_token: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let request = self.api.build_fetch_messages(room_id, access_token)?;
        self.api.parse_fetch_messages(self.exchange(request).await?)
    }

    pub async fn send_message(
        &self,
        room_id: i64,
        content: &str,
        access_token: &str,
    ) -> Result<ChatMessage, ApiError> {
        let request = self.api.build_send_message(room_id, content, access_token)?;
        self.api.parse_send_message(self.exchange(request).await?)
    }

    pub async fn create_chat_room(&self, name: &str, access_token: &str) -> Result<ChatRoom, ApiError> {
        let request = self.api.build_create_chat_room(name, access_token)?;
        self.api.parse_create_chat_room(self.exchange(request).await?)
    }
}
