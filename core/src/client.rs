//! Stateless request builder and response parser for the Roamly API.
//!
//! # Design
//! `ApiClient` holds only its `ApiConfig` and carries no mutable state
//! between calls. Each operation is split into a `build_*` method producing
//! an `HttpRequest` and a `parse_*` method consuming an `HttpResponse`; both
//! delegate to the generic `build_request` / `handle_response` pair. The
//! caller executes the HTTP round-trip in between (see `AsyncClient` for the
//! version that does it for you).

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AuthTokens, ChatMessage, ChatRoom, Credentials, HealthStatus, LogoutRequest, MessageEnvelope,
    NewMessage, NewRoom,
};

/// Synchronous, stateless client for the Roamly API.
///
/// Cheap to clone and safe to share; every method is a pure function of the
/// configured base URL and its arguments.
#[derive(Debug, Clone, Default)]
pub struct ApiClient {
    config: ApiConfig,
}

/// Which backend app a health check targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthApp {
    Auth,
    Messaging,
}

impl HealthApp {
    fn path(self) -> &'static str {
        match self {
            HealthApp::Auth => "auth/health/",
            HealthApp::Messaging => "messaging/health/",
        }
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_config(ApiConfig::new(base_url))
    }

    pub fn with_config(config: ApiConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Build a request for `path` relative to the base URL.
    ///
    /// Always sets `content-type: application/json`; adds a bearer
    /// `authorization` header when `bearer` is given and a JSON body when
    /// `body` is given.
    pub fn build_request<B>(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<&B>,
        bearer: Option<&str>,
    ) -> Result<HttpRequest, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.resolve(path)?;

        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if let Some(token) = bearer {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(ApiError::Encoding)?;

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Interpret a response: classify non-2xx statuses, then decode the body
    /// as `T`.
    pub fn handle_response<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        check_status(&response)?;
        serde_json::from_slice(&response.body).map_err(|e| {
            warn!(status = response.status, error = %e, "response body did not match expected shape");
            ApiError::Decoding(e)
        })
    }

    // --- auth ---

    pub fn build_register(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.build_request("auth/register/", HttpMethod::Post, Some(credentials), None)
    }

    /// The acknowledgement body is decoded, then discarded.
    pub fn parse_register(&self, response: HttpResponse) -> Result<(), ApiError> {
        let _: MessageEnvelope = self.handle_response(response)?;
        Ok(())
    }

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.build_request("auth/login/", HttpMethod::Post, Some(credentials), None)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<AuthTokens, ApiError> {
        self.handle_response(response)
    }

    pub fn build_logout(&self, refresh: &str, access_token: &str) -> Result<HttpRequest, ApiError> {
        let payload = LogoutRequest {
            refresh: refresh.to_string(),
        };
        self.build_request("auth/logout/", HttpMethod::Post, Some(&payload), Some(access_token))
    }

    /// Logout answers 204 with no body, so only the status is checked.
    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn build_health(&self, app: HealthApp) -> Result<HttpRequest, ApiError> {
        self.build_request::<()>(app.path(), HttpMethod::Get, None, None)
    }

    pub fn parse_health(&self, response: HttpResponse) -> Result<HealthStatus, ApiError> {
        self.handle_response(response)
    }

    // --- messaging ---

    pub fn build_fetch_chat_rooms(&self, access_token: &str) -> Result<HttpRequest, ApiError> {
        self.build_request::<()>("messaging/rooms/", HttpMethod::Get, None, Some(access_token))
    }

    pub fn parse_fetch_chat_rooms(&self, response: HttpResponse) -> Result<Vec<ChatRoom>, ApiError> {
        self.handle_response(response)
    }

    pub fn build_fetch_messages(&self, room_id: i64, access_token: &str) -> Result<HttpRequest, ApiError> {
        self.build_request::<()>(&messages_path(room_id), HttpMethod::Get, None, Some(access_token))
    }

    pub fn parse_fetch_messages(&self, response: HttpResponse) -> Result<Vec<ChatMessage>, ApiError> {
        self.handle_response(response)
    }

    pub fn build_send_message(
        &self,
        room_id: i64,
        content: &str,
        access_token: &str,
    ) -> Result<HttpRequest, ApiError> {
        let payload = NewMessage {
            content: content.to_string(),
        };
        self.build_request(&messages_path(room_id), HttpMethod::Post, Some(&payload), Some(access_token))
    }

    pub fn parse_send_message(&self, response: HttpResponse) -> Result<ChatMessage, ApiError> {
        self.handle_response(response)
    }

    pub fn build_create_chat_room(&self, name: &str, access_token: &str) -> Result<HttpRequest, ApiError> {
        let payload = NewRoom {
            name: name.to_string(),
        };
        self.build_request("messaging/rooms/", HttpMethod::Post, Some(&payload), Some(access_token))
    }

    pub fn parse_create_chat_room(&self, response: HttpResponse) -> Result<ChatRoom, ApiError> {
        self.handle_response(response)
    }

    /// Resolve `path` beneath the base URL. The result must stay under the
    /// base: absolute URLs, rooted paths and `..` escapes are rejected.
    fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        if path.trim().is_empty() {
            return Err(ApiError::InvalidRequest("empty path".to_string()));
        }
        if path.starts_with('/') {
            return Err(ApiError::InvalidRequest(format!("path must be relative: {path}")));
        }

        let base_str = self.config.base_url();
        let base = Url::parse(base_str)
            .map_err(|e| ApiError::InvalidRequest(format!("base URL {base_str}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!("base URL {base_str} is not an http(s) URL")));
        }
        // Joining drops the base's query and fragment, so neither can reach the server.
        if base.query().is_some() || base.fragment().is_some() {
            return Err(ApiError::InvalidRequest(format!(
                "base URL {base_str} must not carry a query or fragment"
            )));
        }

        let url = base
            .join(path)
            .map_err(|e| ApiError::InvalidRequest(format!("{path}: {e}")))?;
        if !url.as_str().starts_with(base.as_str()) {
            return Err(ApiError::InvalidRequest(format!("{path} resolves outside {base}")));
        }
        Ok(url)
    }
}

fn messages_path(room_id: i64) -> String {
    format!("messaging/rooms/{room_id}/messages/")
}

/// Map anything but a 2xx status to `ApiError`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if !response.is_well_formed() {
        warn!(status = response.status, "transport returned a non-HTTP status");
        return Err(ApiError::Unknown);
    }
    if response.is_success() {
        return Ok(());
    }
    let message = parse_error_message(&response.body);
    debug!(status = response.status, ?message, "server rejected request");
    Err(ApiError::Server {
        status: response.status,
        message,
    })
}

/// Pull a human-readable message out of an error body, trying `detail`,
/// then `error`, then `message`. Bodies that are not JSON objects yield
/// `None`.
fn parse_error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let object = value.as_object()?;
    ["detail", "error", "message"]
        .iter()
        .find_map(|key| object.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:8000/api")
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse::new(200, body)
    }

    #[test]
    fn build_login_produces_correct_request() {
        let req = client().build_login(&Credentials::new("a@b.c", "pw")).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8000/api/auth/login/");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("authorization"), None);
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["email"], "a@b.c");
        assert_eq!(body["password"], "pw");
    }

    #[test]
    fn build_fetch_chat_rooms_sets_bearer_and_no_body() {
        let req = client().build_fetch_chat_rooms("tok").unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/api/messaging/rooms/");
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_send_message_targets_room() {
        let req = client().build_send_message(42, "hello", "tok").unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8000/api/messaging/rooms/42/messages/");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"content": "hello"}));
    }

    #[test]
    fn build_create_chat_room_sends_name() {
        let req = client().build_create_chat_room("Jeju trip", "tok").unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/messaging/rooms/");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"name": "Jeju trip"}));
    }

    #[test]
    fn build_logout_carries_refresh_and_bearer() {
        let req = client().build_logout("ref", "acc").unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/auth/logout/");
        assert_eq!(req.header("authorization"), Some("Bearer acc"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"refresh": "ref"}));
    }

    #[test]
    fn build_health_paths() {
        let c = client();
        assert_eq!(
            c.build_health(HealthApp::Auth).unwrap().url,
            "http://localhost:8000/api/auth/health/"
        );
        assert_eq!(
            c.build_health(HealthApp::Messaging).unwrap().url,
            "http://localhost:8000/api/messaging/health/"
        );
    }

    #[test]
    fn empty_path_is_invalid() {
        let err = client().build_request::<()>("", HttpMethod::Get, None, None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        let err = client().build_request::<()>("   ", HttpMethod::Get, None, None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn malformed_paths_are_invalid() {
        let c = client();
        for path in ["/auth/login/", "http://[::1", "https://elsewhere.test/x", "../admin/"] {
            let err = c.build_request::<()>(path, HttpMethod::Get, None, None).unwrap_err();
            assert!(matches!(err, ApiError::InvalidRequest(_)), "{path}");
        }
    }

    #[test]
    fn base_url_with_query_or_fragment_is_invalid() {
        for base in ["http://localhost:8000/api?v=1", "http://localhost:8000/api#top"] {
            let err = ApiClient::new(base).build_fetch_chat_rooms("tok").unwrap_err();
            match err {
                ApiError::InvalidRequest(message) => {
                    assert!(message.contains("query or fragment"), "{message}")
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn bare_host_base_url_resolves_at_root() {
        let req = ApiClient::new("http://localhost:8000").build_fetch_chat_rooms("tok").unwrap();
        assert_eq!(req.url, "http://localhost:8000/messaging/rooms/");
    }

    #[test]
    fn malformed_base_url_is_invalid() {
        let err = ApiClient::new("not a url").build_fetch_chat_rooms("tok").unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        let err = ApiClient::new("mailto:someone@example.com")
            .build_fetch_chat_rooms("tok")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn parse_login_success() {
        let tokens = client().parse_login(ok(r#"{"access":"a","refresh":"r"}"#)).unwrap();
        assert_eq!(
            tokens,
            AuthTokens {
                access: "a".to_string(),
                refresh: "r".to_string()
            }
        );
    }

    #[test]
    fn server_error_prefers_detail() {
        let response = HttpResponse::new(401, r#"{"detail":"bad creds","error":"e","message":"m"}"#);
        let err = client().parse_login(response).unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 401, message: Some(ref m) } if m == "bad creds"));
    }

    #[test]
    fn server_error_falls_back_to_error_then_message() {
        let response = HttpResponse::new(400, r#"{"error":"e","message":"m"}"#);
        let err = client().parse_register(response).unwrap_err();
        assert_eq!(err.server_message(), Some("e"));

        let response = HttpResponse::new(400, r#"{"message":"m"}"#);
        let err = client().parse_register(response).unwrap_err();
        assert_eq!(err.server_message(), Some("m"));
    }

    #[test]
    fn server_error_skips_null_and_non_string_keys() {
        let response = HttpResponse::new(400, r#"{"detail":null,"error":["list"],"message":"m"}"#);
        let err = client().parse_fetch_chat_rooms(response).unwrap_err();
        assert_eq!(err.server_message(), Some("m"));
    }

    #[test]
    fn unparseable_error_body_yields_no_message() {
        for body in ["", "<html>oops</html>", "[1,2]", r#""text""#] {
            let err = client()
                .parse_fetch_chat_rooms(HttpResponse::new(500, body))
                .unwrap_err();
            assert!(
                matches!(err, ApiError::Server { status: 500, message: None }),
                "{body}"
            );
        }
    }

    #[test]
    fn non_http_status_is_unknown() {
        let err = client().parse_fetch_chat_rooms(HttpResponse::new(0, "[]")).unwrap_err();
        assert!(matches!(err, ApiError::Unknown));
        let err = client().parse_fetch_chat_rooms(HttpResponse::new(999, "[]")).unwrap_err();
        assert!(matches!(err, ApiError::Unknown));
    }

    #[test]
    fn missing_required_field_is_decoding_error() {
        let response = ok(r#"{"sender_email":"a@b.c","content":"hi"}"#);
        let err = client().parse_send_message(response).unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)));
    }

    #[test]
    fn malformed_timestamp_is_decoding_error() {
        let response = ok(r#"{"id":1,"sender_email":"a@b.c","content":"hi","created_at":"noon"}"#);
        let err = client().parse_send_message(response).unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)));
    }

    #[test]
    fn invalid_utf8_body_is_decoding_error() {
        let mut body = br#"{"id":1,"sender_email":"a@b.c","content":""#.to_vec();
        body.push(0xff);
        body.extend_from_slice(br#""}"#);
        let err = client().parse_send_message(HttpResponse::new(201, body)).unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)), "{err:?}");
    }

    #[test]
    fn invalid_utf8_error_body_yields_no_message() {
        let err = client()
            .parse_fetch_chat_rooms(HttpResponse::new(500, vec![0xff, 0xfe]))
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 500, message: None }));
    }

    #[test]
    fn empty_message_list_is_ok() {
        let messages = client().parse_fetch_messages(ok("[]")).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn register_ack_is_discarded() {
        let response = HttpResponse::new(201, r#"{"message":"registered"}"#);
        assert!(client().parse_register(response).is_ok());
    }

    #[test]
    fn register_with_unreadable_ack_is_decoding_error() {
        let response = HttpResponse::new(201, "registered");
        let err = client().parse_register(response).unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)));
    }

    #[test]
    fn logout_accepts_empty_no_content() {
        assert!(client().parse_logout(HttpResponse::new(204, "")).is_ok());
        let err = client()
            .parse_logout(HttpResponse::new(400, r#"{"detail":"invalid refresh"}"#))
            .unwrap_err();
        assert_eq!(err.server_message(), Some("invalid refresh"));
    }

    #[test]
    fn parse_health_success() {
        let health = client().parse_health(ok(r#"{"ok":true,"app":"accounts"}"#)).unwrap();
        assert!(health.ok);
        assert_eq!(health.app, "accounts");
    }
}
