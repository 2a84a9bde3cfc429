use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method},
    routing::{get, post, put},
    Json, Router,
};
use barakholka_shared::{Ad, AdId, MessageBody, MessageId, RoomId, User, UserId};
use barakholka_store::{
    ChatRoom, Database, FavoriteEntry, FavoriteOutcome, Message, RoomSummary, RoomView,
    SiteStatistics,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::identity::{require_staff, verify_admin_token, CurrentUser};
use crate::rate_limit::MessageRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub rate_limiter: MessageRateLimiter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            rate_limiter: MessageRateLimiter::new(config.message_rate, config.message_burst),
            config: Arc::new(config),
        }
    }

    /// Run a store operation on the blocking pool with the connection locked.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&mut Database) -> barakholka_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = db
                .lock()
                .map_err(|_| ServerError::Internal("database lock poisoned".into()))?;
            f(&mut *guard).map_err(ServerError::from)
        })
        .await?
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Chat
        .route("/chats", get(list_chats))
        .route("/support/chat", post(open_general_chat))
        .route("/ads/:ad_id/chat", post(open_chat_for_ad))
        .route("/chats/:room_id", get(view_room).post(reply_in_room))
        .route("/chats/:room_id/messages", get(poll_messages))
        .route("/chats/:room_id/unread", get(unread_count))
        // Favorites
        .route("/favorites", get(list_favorites))
        .route(
            "/favorites/:ad_id",
            post(add_favorite).delete(remove_favorite),
        )
        .route("/favorites/:ad_id/toggle", post(toggle_favorite))
        // Staff
        .route("/admin/statistics", get(current_statistics))
        .route("/admin/statistics/recompute", post(recompute_statistics))
        // Directory sync (identity and ad services)
        .route("/directory/users/:id", put(put_user).delete(delete_user))
        .route("/directory/ads/:id", put(put_ad).delete(delete_ad))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Payloads ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    name: String,
    version: &'static str,
}

#[derive(Deserialize)]
struct PostMessageRequest {
    content: String,
}

#[derive(Deserialize)]
struct PollQuery {
    /// Last message id the client already has.
    after: Option<MessageId>,
}

#[derive(Serialize)]
struct UnreadResponse {
    room_id: RoomId,
    unread_count: u64,
}

#[derive(Serialize)]
struct FavoriteResponse {
    ad_id: AdId,
    outcome: FavoriteOutcome,
}

#[derive(Serialize)]
struct StatisticsResponse {
    #[serde(flatten)]
    snapshot: SiteStatistics,
    avg_ads_per_user: f64,
    avg_messages_per_chat: f64,
    active_ads_percentage: f64,
}

impl From<SiteStatistics> for StatisticsResponse {
    fn from(snapshot: SiteStatistics) -> Self {
        Self {
            avg_ads_per_user: snapshot.avg_ads_per_user(),
            avg_messages_per_chat: snapshot.avg_messages_per_chat(),
            active_ads_percentage: snapshot.active_ads_percentage(),
            snapshot,
        }
    }
}

#[derive(Deserialize)]
struct UserRecord {
    display_name: String,
    #[serde(default)]
    is_seller: bool,
    #[serde(default)]
    is_staff: bool,
    joined_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct AdRecord {
    seller: UserId,
    title: String,
    #[serde(default = "default_available")]
    available: bool,
    created_at: Option<DateTime<Utc>>,
}

fn default_available() -> bool {
    true
}

// ─── Health ───

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Chat ───

async fn list_chats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<RoomSummary>>, ServerError> {
    let viewer = user.id();
    let rooms = state.with_db(move |db| db.list_rooms_for(viewer)).await?;
    Ok(Json(rooms))
}

async fn open_general_chat(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ChatRoom>, ServerError> {
    let buyer = user.id();
    let room = state.with_db(move |db| db.open_general_chat(buyer)).await?;
    info!(room_id = %room.id, buyer = %buyer, "general chat opened");
    Ok(Json(room))
}

async fn open_chat_for_ad(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ad_id): Path<AdId>,
) -> Result<Json<ChatRoom>, ServerError> {
    let buyer = user.id();
    let room = state
        .with_db(move |db| db.open_chat_for_ad(buyer, ad_id))
        .await?;
    info!(room_id = %room.id, buyer = %buyer, ad = %ad_id, "ad chat opened");
    Ok(Json(room))
}

/// Opening a room marks the counterpart's messages as read.
async fn view_room(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(room_id): Path<RoomId>,
) -> Result<Json<RoomView>, ServerError> {
    let viewer = user.id();
    let view = state
        .with_db(move |db| db.enter_room(room_id, viewer, None))
        .await?;
    Ok(Json(view))
}

async fn reply_in_room(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(room_id): Path<RoomId>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<RoomView>, ServerError> {
    let body = MessageBody::parse(&req.content)
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;

    let sender = user.id();
    state.rate_limiter.check(sender).await?;

    let view = state
        .with_db(move |db| db.enter_room(room_id, sender, Some(&body)))
        .await?;
    Ok(Json(view))
}

/// Read-only: polling does not mark anything as read.
async fn poll_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(room_id): Path<RoomId>,
    Query(query): Query<PollQuery>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let viewer = user.id();
    let messages = state
        .with_db(move |db| match query.after {
            Some(last_id) => db.list_messages_since(room_id, viewer, last_id),
            None => db.list_messages(room_id, viewer),
        })
        .await?;
    Ok(Json(messages))
}

async fn unread_count(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(room_id): Path<RoomId>,
) -> Result<Json<UnreadResponse>, ServerError> {
    let viewer = user.id();
    let unread_count = state
        .with_db(move |db| db.unread_count_for(room_id, viewer))
        .await?;
    Ok(Json(UnreadResponse {
        room_id,
        unread_count,
    }))
}

// ─── Favorites ───

async fn list_favorites(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<FavoriteEntry>>, ServerError> {
    let id = user.id();
    let entries = state.with_db(move |db| db.list_favorites(id)).await?;
    Ok(Json(entries))
}

async fn add_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ad_id): Path<AdId>,
) -> Result<Json<FavoriteResponse>, ServerError> {
    let id = user.id();
    let outcome = state.with_db(move |db| db.add_favorite(id, ad_id)).await?;
    Ok(Json(FavoriteResponse { ad_id, outcome }))
}

async fn remove_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ad_id): Path<AdId>,
) -> Result<Json<FavoriteResponse>, ServerError> {
    let id = user.id();
    let outcome = state
        .with_db(move |db| db.remove_favorite(id, ad_id))
        .await?;
    Ok(Json(FavoriteResponse { ad_id, outcome }))
}

async fn toggle_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ad_id): Path<AdId>,
) -> Result<Json<FavoriteResponse>, ServerError> {
    let id = user.id();
    let outcome = state
        .with_db(move |db| db.toggle_favorite(id, ad_id))
        .await?;
    Ok(Json(FavoriteResponse { ad_id, outcome }))
}

// ─── Statistics ───

async fn current_statistics(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<StatisticsResponse>, ServerError> {
    require_staff(&user)?;
    let stats = state.with_db(|db| db.current_statistics()).await?;
    Ok(Json(stats.into()))
}

async fn recompute_statistics(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<StatisticsResponse>, ServerError> {
    require_staff(&user)?;
    let stats = state.with_db(|db| db.recompute_statistics()).await?;
    info!(by = %user.id(), "statistics recomputed via API");
    Ok(Json(stats.into()))
}

// ─── Directory sync ───

async fn put_user(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(record): Json<UserRecord>,
) -> Result<Json<User>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let user = User {
        id,
        display_name: record.display_name,
        is_seller: record.is_seller,
        is_staff: record.is_staff,
        joined_at: record.joined_at.unwrap_or_else(Utc::now),
    };
    let stored = user.clone();
    state.with_db(move |db| db.upsert_user(&stored)).await?;

    info!(user = %id, staff = user.is_staff, "directory user synced");
    Ok(Json(user))
}

async fn delete_user(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<serde_json::Value>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let deleted = state.with_db(move |db| db.delete_user(id)).await?;
    if !deleted {
        return Err(ServerError::NotFound(format!("user {id}")));
    }

    info!(user = %id, "directory user removed");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn put_ad(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<AdId>,
    Json(record): Json<AdRecord>,
) -> Result<Json<Ad>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let ad = Ad {
        id,
        seller: record.seller,
        title: record.title,
        available: record.available,
        created_at: record.created_at.unwrap_or_else(Utc::now),
    };
    let stored = ad.clone();
    state
        .with_db(move |db| {
            // Reject unknown sellers with a 404 instead of a foreign key error.
            db.get_user(stored.seller)?;
            db.upsert_ad(&stored)
        })
        .await?;

    info!(ad = %id, seller = %ad.seller, "directory ad synced");
    Ok(Json(ad))
}

async fn delete_ad(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<AdId>,
) -> Result<Json<serde_json::Value>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let deleted = state.with_db(move |db| db.delete_ad(id)).await?;
    if !deleted {
        return Err(ServerError::NotFound(format!("ad {id}")));
    }

    info!(ad = %id, "directory ad removed");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const TOKEN: &str = "directory-token";

    struct TestApp {
        router: Router,
        state: AppState,
        _dir: TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            Self::with_config(ServerConfig {
                admin_token: Some(TOKEN.to_string()),
                ..ServerConfig::default()
            })
        }

        fn with_config(config: ServerConfig) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let db = Database::open_at(&dir.path().join("api.db")).unwrap();
            let state = AppState::new(db, config);
            Self {
                router: build_router(state.clone()),
                state,
                _dir: dir,
            }
        }

        /// buyer 1, seller 2, staff 3, stranger 4; ad 10 sold by 2.
        fn seeded() -> Self {
            let app = Self::new();
            {
                let db = app.state.db.lock().unwrap();
                let people = [
                    (1, "buyer", false),
                    (2, "seller", false),
                    (3, "support", true),
                    (4, "stranger", false),
                ];
                for (id, name, staff) in people {
                    db.upsert_user(&User {
                        id: UserId(id),
                        display_name: name.into(),
                        is_seller: id == 2,
                        is_staff: staff,
                        joined_at: Utc::now(),
                    })
                    .unwrap();
                }
                db.upsert_ad(&Ad {
                    id: AdId(10),
                    seller: UserId(2),
                    title: "Road bike".into(),
                    available: true,
                    created_at: Utc::now(),
                })
                .unwrap();
            }
            app
        }

        async fn call(
            &self,
            method: &str,
            uri: &str,
            user: Option<i64>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(id) = user {
                builder = builder.header("x-user-id", id.to_string());
            }
            self.send(builder, body).await
        }

        async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let builder = Request::builder()
                .method(method)
                .uri(uri)
                .header("authorization", format!("Bearer {TOKEN}"));
            self.send(builder, body).await
        }

        async fn send(
            &self,
            mut builder: axum::http::request::Builder,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let body = match body {
                Some(v) => {
                    builder = builder.header("content-type", "application/json");
                    Body::from(serde_json::to_vec(&v).unwrap())
                }
                None => Body::empty(),
            };

            let response = self
                .router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();

            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, json)
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_requires_identity() {
        let app = TestApp::seeded();

        let (status, _) = app.call("GET", "/chats", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.call("GET", "/chats", Some(99), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_chat_flow() {
        let app = TestApp::seeded();

        let (status, room) = app.call("POST", "/ads/10/chat", Some(1), None).await;
        assert_eq!(status, StatusCode::OK);
        let room_id = room["id"].as_i64().unwrap();

        let (_, again) = app.call("POST", "/ads/10/chat", Some(1), None).await;
        assert_eq!(again["id"].as_i64().unwrap(), room_id);

        let uri = format!("/chats/{room_id}");
        let (status, view) = app
            .call("POST", &uri, Some(1), Some(json!({ "content": "  still available? " })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["posted"]["content"], "still available?");

        let (_, unread) = app
            .call("GET", &format!("{uri}/unread"), Some(2), None)
            .await;
        assert_eq!(unread["unread_count"], 1);

        let (_, chats) = app.call("GET", "/chats", Some(2), None).await;
        assert_eq!(chats[0]["unread_count"], 1);
        assert_eq!(chats[0]["ad_title"], "Road bike");

        let (status, view) = app.call("GET", &uri, Some(2), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["marked_read"], 1);
        assert_eq!(view["role"], "seller");

        let (_, unread) = app
            .call("GET", &format!("{uri}/unread"), Some(2), None)
            .await;
        assert_eq!(unread["unread_count"], 0);
    }

    #[tokio::test]
    async fn test_seller_cannot_chat_with_self() {
        let app = TestApp::seeded();
        let (status, _) = app.call("POST", "/ads/10/chat", Some(2), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.call("POST", "/ads/404/chat", Some(1), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stranger_forbidden() {
        let app = TestApp::seeded();
        let (_, room) = app.call("POST", "/ads/10/chat", Some(1), None).await;
        let uri = format!("/chats/{}", room["id"]);

        let paths = [
            ("GET", uri.clone()),
            ("GET", format!("{uri}/unread")),
            ("GET", format!("{uri}/messages")),
        ];
        for (method, path) in paths {
            let (status, _) = app.call(method, &path, Some(4), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {path}");
        }
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let app = TestApp::seeded();
        let (_, room) = app.call("POST", "/ads/10/chat", Some(1), None).await;
        let uri = format!("/chats/{}", room["id"]);

        let (status, body) = app
            .call("POST", &uri, Some(1), Some(json!({ "content": "   " })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn test_poll_messages_after_id() {
        let app = TestApp::seeded();
        let (_, room) = app.call("POST", "/ads/10/chat", Some(1), None).await;
        let uri = format!("/chats/{}", room["id"]);

        let (_, first) = app
            .call("POST", &uri, Some(1), Some(json!({ "content": "one" })))
            .await;
        app.call("POST", &uri, Some(2), Some(json!({ "content": "two" })))
            .await;
        let first_id = first["posted"]["id"].as_i64().unwrap();

        let (status, newer) = app
            .call("GET", &format!("{uri}/messages?after={first_id}"), Some(1), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let newer = newer.as_array().unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0]["content"], "two");
        // Polling leaves read state alone.
        assert_eq!(newer[0]["is_read"], false);

        let (_, all) = app
            .call("GET", &format!("{uri}/messages"), Some(1), None)
            .await;
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_general_chat() {
        let app = TestApp::seeded();
        let (status, room) = app.call("POST", "/support/chat", Some(1), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(room["seller"], 3);
        assert_eq!(room["ad"], Value::Null);
    }

    #[tokio::test]
    async fn test_general_chat_without_staff() {
        let app = TestApp::new();
        app.admin("PUT", "/directory/users/1", Some(json!({ "display_name": "buyer" })))
            .await;

        let (status, body) = app.call("POST", "/support/chat", Some(1), None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "No support agent available");
    }

    #[tokio::test]
    async fn test_favorites() {
        let app = TestApp::seeded();

        let (status, body) = app.call("POST", "/favorites/10", Some(1), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "added");

        let (_, body) = app.call("POST", "/favorites/10", Some(1), None).await;
        assert_eq!(body["outcome"], "already_exists");

        let (_, list) = app.call("GET", "/favorites", Some(1), None).await;
        assert_eq!(list[0]["ad_title"], "Road bike");
        assert_eq!(list[0]["seller_name"], "seller");

        let (_, body) = app.call("DELETE", "/favorites/10", Some(1), None).await;
        assert_eq!(body["outcome"], "removed");
        let (_, body) = app.call("DELETE", "/favorites/10", Some(1), None).await;
        assert_eq!(body["outcome"], "not_found");

        let (_, body) = app.call("POST", "/favorites/10/toggle", Some(1), None).await;
        assert_eq!(body["outcome"], "added");

        let (status, _) = app.call("POST", "/favorites/10", Some(2), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_statistics_staff_only() {
        let app = TestApp::seeded();
        app.call("POST", "/favorites/10", Some(1), None).await;

        let (status, _) = app
            .call("POST", "/admin/statistics/recompute", Some(1), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, stats) = app
            .call("POST", "/admin/statistics/recompute", Some(3), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_users"], 4);
        assert_eq!(stats["total_ads"], 1);
        assert_eq!(stats["total_favorites"], 1);
        assert_eq!(stats["avg_ads_per_user"], 0.25);
        assert_eq!(stats["active_ads_percentage"], 100.0);
        assert_eq!(stats["avg_messages_per_chat"], 0.0);

        let (_, current) = app.call("GET", "/admin/statistics", Some(3), None).await;
        assert_eq!(current["total_users"], 4);
    }

    #[tokio::test]
    async fn test_directory_sync() {
        let app = TestApp::new();

        let (status, _) = app
            .call("PUT", "/directory/users/1", None, Some(json!({ "display_name": "x" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .admin("PUT", "/directory/ads/10", Some(json!({ "seller": 2, "title": "Lamp" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .admin(
                "PUT",
                "/directory/users/2",
                Some(json!({ "display_name": "seller", "is_seller": true })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, ad) = app
            .admin("PUT", "/directory/ads/10", Some(json!({ "seller": 2, "title": "Lamp" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ad["available"], true);

        let (status, _) = app.admin("DELETE", "/directory/ads/10", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.admin("DELETE", "/directory/ads/10", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_message_rate_limit() {
        let app = TestApp::with_config(ServerConfig {
            message_rate: 0.001,
            message_burst: 2.0,
            ..ServerConfig::default()
        });
        {
            let db = app.state.db.lock().unwrap();
            for id in [1, 2] {
                db.upsert_user(&User {
                    id: UserId(id),
                    display_name: format!("user {id}"),
                    is_seller: false,
                    is_staff: id == 2,
                    joined_at: Utc::now(),
                })
                .unwrap();
            }
        }

        let (_, room) = app.call("POST", "/support/chat", Some(1), None).await;
        let uri = format!("/chats/{}", room["id"]);
        for _ in 0..2 {
            let (status, _) = app
                .call("POST", &uri, Some(1), Some(json!({ "content": "hello?" })))
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, _) = app
            .call("POST", &uri, Some(1), Some(json!({ "content": "hello??" })))
            .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}
