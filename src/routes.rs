use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::{self, Database, Feed, FeedFollow};

const DEFAULT_POSTS_LIMIT: i64 = 10;

pub struct AppState {
    pub db: Arc<Database>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/healthz", get(healthz))
        .route("/v1/err", get(err))
        .route("/v1/users", get(get_user).post(create_user))
        .route("/v1/feeds", get(get_feeds).post(create_feed))
        .route(
            "/v1/feed_follows",
            get(get_feed_follows).post(create_feed_follow),
        )
        .route("/v1/feed_follows/:id", delete(delete_feed_follow))
        .route("/v1/posts", get(get_posts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        let err = err.into();
        error!("Request failed: {:#}", err);
        ApiError::internal("something went wrong in the database")
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| {
            ApiError::bad_request(format!(
                "please check your request body: {}",
                rejection.body_text()
            ))
        })
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::bad_request(format!("the {} id you provided is malformed", what)))
}

// Route handlers
pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn err() -> ApiError {
    ApiError::internal("Internal Server Error")
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    let user = state.db.create_user(name).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(AuthUser(user): AuthUser) -> impl IntoResponse {
    Json(user)
}

pub async fn get_feeds(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let feeds = state.db.get_feeds().await?;
    Ok(Json(feeds))
}

#[derive(Debug, Deserialize)]
pub struct CreateFeedRequest {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CreateFeedResponse {
    pub feed: Feed,
    pub feed_follow: FeedFollow,
}

/// Creates the feed and makes its creator follow it.
pub async fn create_feed(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateFeedRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let name = request.name.trim();
    let url = request.url.trim();
    if name.is_empty() || url.is_empty() {
        return Err(ApiError::bad_request("name and url are required"));
    }

    let feed = match state.db.create_feed(user.id, name, url).await {
        Ok(feed) => feed,
        Err(e) if db::is_unique_violation(&e) => {
            return Err(ApiError::conflict("a feed with this url already exists"));
        }
        Err(e) => return Err(e.into()),
    };
    let feed_follow = state.db.create_feed_follow(user.id, feed.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateFeedResponse { feed, feed_follow }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateFeedFollowRequest {
    #[serde(alias = "FeedId", alias = "feedId")]
    pub feed_id: String,
}

pub async fn create_feed_follow(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateFeedFollowRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let feed_id = parse_id(&request.feed_id, "feed")?;

    if state.db.get_feed(feed_id).await?.is_none() {
        return Err(ApiError::not_found("feed not found"));
    }

    match state.db.create_feed_follow(user.id, feed_id).await {
        Ok(follow) => Ok((StatusCode::CREATED, Json(follow))),
        Err(e) if db::is_unique_violation(&e) => {
            Err(ApiError::conflict("you already follow this feed"))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_feed_follow(
    State(state): State<Arc<AppState>>,
    Path(follow_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let follow_id = parse_id(&follow_id, "feed follow")?;

    if state.db.delete_feed_follow(follow_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("feed follow not found"))
    }
}

pub async fn get_feed_follows(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let follows = state.db.get_feed_follows_for_user(user.id).await?;
    Ok(Json(follows))
}

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    pub limit: Option<String>,
}

impl PostsQuery {
    /// Falls back to the default when missing or not a non-negative count.
    /// Zero is honoured and returns no posts.
    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .map(i64::from)
            .unwrap_or(DEFAULT_POSTS_LIMIT)
    }
}

pub async fn get_posts(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<PostsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.db.get_posts_for_user(user.id, query.limit()).await?;
    Ok(Json(posts))
}
