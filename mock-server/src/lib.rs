//! In-memory stand-in for the Roamly REST backend.
//!
//! Serves the auth and messaging routes under `/api` with the same JSON
//! shapes, status codes and error bodies as the real service. Tokens are
//! random UUID strings; state lives for the lifetime of the router.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_email: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: i64,
    pub name: String,
    pub participants: Vec<String>,
    pub messages: Vec<ChatMessage>,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

#[derive(Deserialize)]
pub struct CredentialsInput {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LogoutInput {
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Deserialize)]
pub struct NewRoomInput {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct NewMessageInput {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Default)]
pub struct Store {
    /// email -> password
    users: HashMap<String, String>,
    /// access token -> email
    access: HashMap<String, String>,
    /// refresh token -> email
    refresh: HashMap<String, String>,
    rooms: BTreeMap<i64, ChatRoom>,
    next_room_id: i64,
    next_message_id: i64,
}

pub type Db = Arc<RwLock<Store>>;

type Rejection = (StatusCode, Json<Value>);

pub fn app() -> Router {
    router(Arc::new(RwLock::new(Store::default())))
}

pub fn router(db: Db) -> Router {
    Router::new()
        .route("/api/auth/health/", get(auth_health))
        .route("/api/auth/register/", post(register))
        .route("/api/auth/login/", post(login))
        .route("/api/auth/logout/", post(logout))
        .route("/api/messaging/health/", get(messaging_health))
        .route("/api/messaging/rooms/", get(list_rooms).post(create_room))
        .route(
            "/api/messaging/rooms/{room_id}/messages/",
            get(list_messages).post(send_message),
        )
        .with_state(db)
}

/// A router answering every request with the same status and JSON body.
pub fn canned(status: StatusCode, body: impl Into<String>) -> Router {
    let body = body.into();
    Router::new().fallback(move || {
        let body = body.clone();
        async move { (status, [(header::CONTENT_TYPE, "application/json")], body) }
    })
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, router).await
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn detail(status: StatusCode, message: &str) -> Rejection {
    (status, Json(json!({ "detail": message })))
}

fn error(status: StatusCode, message: &str) -> Rejection {
    (status, Json(json!({ "error": message })))
}

/// Resolve the bearer token in `headers` to a user email.
fn authenticate(headers: &HeaderMap, store: &Store) -> Result<String, Rejection> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            detail(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            )
        })?;
    store.access.get(token).cloned().ok_or_else(|| {
        detail(
            StatusCode::UNAUTHORIZED,
            "Given token not valid for any token type",
        )
    })
}

/// Check that `room_id` exists and that `email` participates in it.
fn check_room(store: &Store, room_id: i64, email: &str) -> Result<(), Rejection> {
    let room = store
        .rooms
        .get(&room_id)
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Not found."))?;
    if !room.participants.iter().any(|p| p == email) {
        return Err(detail(
            StatusCode::FORBIDDEN,
            "You are not a participant in this room.",
        ));
    }
    Ok(())
}

async fn auth_health() -> Json<Value> {
    Json(json!({ "ok": true, "app": "accounts" }))
}

async fn messaging_health() -> Json<Value> {
    Json(json!({ "ok": true, "app": "messaging" }))
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<CredentialsInput>,
) -> Result<(StatusCode, Json<Value>), Rejection> {
    let (Some(email), Some(password)) = (
        input.email.filter(|e| !e.is_empty()),
        input.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(error(StatusCode::BAD_REQUEST, "email and password required"));
    };

    let mut store = db.write().await;
    if store.users.contains_key(&email) {
        return Err(error(StatusCode::BAD_REQUEST, "user already exists"));
    }
    info!(%email, "registered user");
    store.users.insert(email, password);
    Ok((StatusCode::CREATED, Json(json!({ "message": "registered" }))))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<CredentialsInput>,
) -> Result<Json<Tokens>, Rejection> {
    let (Some(email), Some(password)) = (input.email, input.password) else {
        return Err(detail(StatusCode::BAD_REQUEST, "email and password required"));
    };

    let mut store = db.write().await;
    if store.users.get(&email) != Some(&password) {
        return Err(detail(
            StatusCode::UNAUTHORIZED,
            "No active account found with the given credentials",
        ));
    }

    let tokens = Tokens {
        access: Uuid::new_v4().to_string(),
        refresh: Uuid::new_v4().to_string(),
    };
    store.access.insert(tokens.access.clone(), email.clone());
    store.refresh.insert(tokens.refresh.clone(), email.clone());
    debug!(%email, "issued tokens");
    Ok(Json(tokens))
}

async fn logout(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<LogoutInput>,
) -> Result<StatusCode, Rejection> {
    let mut store = db.write().await;
    let email = authenticate(&headers, &store)?;
    let refresh = input
        .refresh
        .ok_or_else(|| detail(StatusCode::BAD_REQUEST, "refresh token required"))?;
    if store.refresh.get(&refresh) != Some(&email) {
        return Err(detail(StatusCode::BAD_REQUEST, "invalid refresh"));
    }
    store.refresh.remove(&refresh);
    debug!(%email, "blacklisted refresh token");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_rooms(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatRoom>>, Rejection> {
    let store = db.read().await;
    let email = authenticate(&headers, &store)?;
    let rooms = store
        .rooms
        .values()
        .filter(|room| room.participants.contains(&email))
        .cloned()
        .collect();
    Ok(Json(rooms))
}

async fn create_room(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<NewRoomInput>,
) -> Result<(StatusCode, Json<ChatRoom>), Rejection> {
    let mut store = db.write().await;
    let email = authenticate(&headers, &store)?;
    store.next_room_id += 1;
    let room = ChatRoom {
        id: store.next_room_id,
        name: input.name.unwrap_or_default(),
        participants: vec![email],
        messages: Vec::new(),
        created_at: now(),
    };
    info!(room_id = room.id, name = %room.name, "created room");
    store.rooms.insert(room.id, room.clone());
    Ok((StatusCode::CREATED, Json(room)))
}

async fn list_messages(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
) -> Result<Json<Vec<ChatMessage>>, Rejection> {
    let store = db.read().await;
    let email = authenticate(&headers, &store)?;
    check_room(&store, room_id, &email)?;
    let messages = store
        .rooms
        .get(&room_id)
        .map(|room| room.messages.clone())
        .unwrap_or_default();
    Ok(Json(messages))
}

async fn send_message(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    Json(input): Json<NewMessageInput>,
) -> Result<(StatusCode, Json<ChatMessage>), Rejection> {
    let mut store = db.write().await;
    let email = authenticate(&headers, &store)?;
    let Some(content) = input.content.filter(|c| !c.trim().is_empty()) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "content": ["This field is required."] })),
        ));
    };

    check_room(&store, room_id, &email)?;
    store.next_message_id += 1;
    let message = ChatMessage {
        id: store.next_message_id,
        sender_email: email,
        content,
        created_at: now(),
    };
    if let Some(room) = store.rooms.get_mut(&room_id) {
        room.messages.push(message.clone());
    }
    debug!(room_id, message_id = message.id, "stored message");
    Ok((StatusCode::CREATED, Json(message)))
}
