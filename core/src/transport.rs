//! The send-and-await seam between `ApiClient` and the network.
//!
//! # Design
//! `Transport` is the only I/O dependency of the async client. The
//! `reqwest::Client` implementation is the production one; tests substitute
//! their own to observe or fake exchanges. Connection pooling is whatever the
//! implementation does internally.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one HTTP exchange. Non-2xx statuses are returned as data, not
    /// as errors; only failures to obtain a response at all are `Err`.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        // Bytes as received; `ApiClient` rejects invalid UTF-8 when decoding.
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            // The status line already arrived, so a non-2xx status survives a
            // broken body and is classified with no message.
            Err(e) if !(200..=299).contains(&status) => {
                warn!(status, error = %e, "discarding unreadable error body");
                Vec::new()
            }
            Err(e) => return Err(ApiError::Transport(e.to_string())),
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
