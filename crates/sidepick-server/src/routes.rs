//! The thin request dispatcher: authenticate, parse, call the room
//! service, wrap the result in the success envelope.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{OriginalUri, Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use sidepick_protocol::{DivisionResult, RoomCode, RoomSnapshot};
use sidepick_realtime::BroadcastHub;
use sidepick_service::RoomService;
use sidepick_store::SqliteStore;

use crate::auth::{AuthUser, Authenticator};
use crate::config::ServerConfig;
use crate::error::ApiError;

/// The concrete room service this server wires together.
pub type AppService = RoomService<SqliteStore, Arc<BroadcastHub>>;

/// Shared state handed to every handler.
pub struct AppState<A> {
    pub service: Arc<AppService>,
    pub auth: Arc<A>,
}

impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            auth: Arc::clone(&self.auth),
        }
    }
}

/// The success payload envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        code: 0,
        message: "success".to_string(),
        data,
    })
}

pub fn build_router<A: Authenticator>(state: AppState<A>, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/room/create", post(create_room::<A>))
        .route("/api/room/my-room", get(my_room::<A>))
        .route("/api/room/my-joined-room", get(my_joined_room::<A>))
        .route(
            "/api/room/{code}",
            get(get_room::<A>).delete(close_room::<A>),
        )
        .route("/api/room/{code}/join", post(join_room::<A>))
        .route("/api/room/{code}/leave", post(leave_room::<A>))
        .route(
            "/api/room/{code}/remove/{member_id}",
            post(remove_member::<A>),
        )
        .route("/api/room/{code}/divide", post(divide_teams::<A>))
        .route("/api/room/{code}/redivide", post(redivide_teams::<A>))
        .route("/api/room/{code}/result", get(division_result::<A>))
        .route(
            "/api/room/{code}/member/{member_id}/labels",
            post(set_member_labels::<A>),
        )
        .route("/api/room/{code}/label-rules", post(set_label_rules::<A>))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    game_name: String,
    max_members: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SetLabelsRequest {
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetLabelRulesRequest {
    label_rules: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SuccessFlag {
    success: bool,
}

const DONE: SuccessFlag = SuccessFlag { success: true };

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

/// Resolves the bearer token to a caller and pushes the profile through to
/// the user store, so the identity is usable in the same request.
async fn caller<A: Authenticator>(
    state: &AppState<A>,
    headers: &HeaderMap,
    path: &str,
) -> Result<AuthUser, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthenticated(path))?;

    let user = state.auth.authenticate(token).await.map_err(|err| {
        tracing::debug!(%path, error = %err, "token rejected");
        ApiError::unauthenticated(path)
    })?;

    state
        .service
        .sync_profile(&user.profile())
        .await
        .map_err(|err| ApiError::from_service(err, path))?;
    Ok(user)
}

/// A malformed code can't name a live room, so it reads as absent.
fn parse_code(raw: &str, path: &str) -> Result<RoomCode, ApiError> {
    RoomCode::parse(raw).map_err(|_| ApiError::new(StatusCode::NOT_FOUND, "room not found", path))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_room<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<CreateRoomRequest>,
) -> Result<Json<Envelope<RoomSnapshot>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let snapshot = state
        .service
        .create_room(&user.id, &body.game_name, body.max_members)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(snapshot))
}

async fn my_room<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<Envelope<Option<RoomSnapshot>>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let snapshot = state
        .service
        .my_owned_room(&user.id)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(snapshot))
}

async fn my_joined_room<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<Envelope<Option<RoomSnapshot>>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let snapshot = state
        .service
        .my_joined_room(&user.id)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(snapshot))
}

async fn get_room<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Envelope<RoomSnapshot>>, ApiError> {
    let path = uri.path().to_string();
    caller(&state, &headers, &path).await?;
    let code = parse_code(&code, &path)?;
    let snapshot = state
        .service
        .get_room(&code)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(snapshot))
}

async fn join_room<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Envelope<RoomSnapshot>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let code = parse_code(&code, &path)?;
    let snapshot = state
        .service
        .join_room(&user.id, &code)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(snapshot))
}

async fn leave_room<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Envelope<SuccessFlag>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let code = parse_code(&code, &path)?;
    state
        .service
        .leave_room(&user.id, &code)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(DONE))
}

async fn remove_member<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    Path((code, member_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Envelope<SuccessFlag>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let code = parse_code(&code, &path)?;
    state
        .service
        .remove_member(&user.id, &code, &member_id.as_str().into())
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(DONE))
}

async fn close_room<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Envelope<SuccessFlag>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let code = parse_code(&code, &path)?;
    state
        .service
        .close_room(&user.id, &code)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(DONE))
}

async fn divide_teams<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Envelope<DivisionResult>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let code = parse_code(&code, &path)?;
    let division = state
        .service
        .divide_teams(&user.id, &code)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(division))
}

async fn redivide_teams<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Envelope<DivisionResult>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let code = parse_code(&code, &path)?;
    let division = state
        .service
        .redivide_teams(&user.id, &code)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(division))
}

async fn division_result<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Envelope<DivisionResult>>, ApiError> {
    let path = uri.path().to_string();
    caller(&state, &headers, &path).await?;
    let code = parse_code(&code, &path)?;
    let division = state
        .service
        .get_division_result(&code)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(division))
}

async fn set_member_labels<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    Path((code, member_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<SetLabelsRequest>,
) -> Result<Json<Envelope<SuccessFlag>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let code = parse_code(&code, &path)?;
    state
        .service
        .set_member_labels(&user.id, &code, &member_id.as_str().into(), &body.labels)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(DONE))
}

async fn set_label_rules<A: Authenticator>(
    State(state): State<AppState<A>>,
    OriginalUri(uri): OriginalUri,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SetLabelRulesRequest>,
) -> Result<Json<Envelope<SuccessFlag>>, ApiError> {
    let path = uri.path().to_string();
    let user = caller(&state, &headers, &path).await?;
    let code = parse_code(&code, &path)?;
    state
        .service
        .set_label_rules(&user.id, &code, &body.label_rules)
        .await
        .map_err(|err| ApiError::from_service(err, &path))?;
    Ok(ok(DONE))
}
