use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::{
    services::{
        AuthenticateUserRequest, RecordSwipeRequest, RegisterUserRequest, SendMessageRequest,
        UpdateProfileRequest,
    },
    MatchDto, MessageDto, RoomDto, SwipeDto, UserDto,
};
use domain::Gender;

use crate::{error::ApiError, state::AppState, ws};

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    email: String,
    password: String,
    gender: Gender,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    user: UserDto,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UpdateProfilePayload {
    username: Option<String>,
    bio: Option<String>,
    gender: Option<Gender>,
    interests: Option<Vec<String>>,
    date_of_birth: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateLocationPayload {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct PushTokenPayload {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SwipePayload {
    to_user_id: Uuid,
    action: String,
}

#[derive(Debug, Serialize)]
struct SwipeResponse {
    swipe: SwipeDto,
    is_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    room: Option<RoomDto>,
}

#[derive(Debug, Deserialize)]
struct SuggestionsQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    content: String,
}

#[derive(Debug, Serialize)]
struct QuotaResetResponse {
    affected: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .route("/ws/rooms/{room_id}", get(ws::websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login_user))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/location", put(update_location))
        .route("/push-token", post(save_push_token))
        .route("/swipes", post(record_swipe))
        .route("/matches", get(list_matches))
        .route("/suggestions", get(get_suggestions))
        .route("/rooms", get(list_rooms))
        .route(
            "/rooms/{room_id}/messages",
            post(send_message).get(list_messages),
        )
        // 内部维护入口，由外部调度器每日触发
        .route("/maintenance/quotas/reset", post(reset_stale_quotas))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let user = state
        .user_service
        .register(RegisterUserRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            gender: payload.gender,
        })
        .await?;

    let token = state.jwt_service.generate_token(Uuid::from(user.id))?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserDto::from(&user),
            token,
        }),
    ))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(AuthenticateUserRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let token = state.jwt_service.generate_token(Uuid::from(user.id))?;
    Ok(Json(AuthResponse {
        user: UserDto::from(&user),
        token,
    }))
}

async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let user = state.user_service.get_user(user_id).await?;
    Ok(Json(UserDto::from(&user)))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<UserDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let user = state
        .user_service
        .update_profile(
            user_id,
            UpdateProfileRequest {
                username: payload.username,
                bio: payload.bio,
                gender: payload.gender,
                interests: payload.interests,
                date_of_birth: payload.date_of_birth,
            },
        )
        .await?;
    Ok(Json(UserDto::from(&user)))
}

async fn update_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateLocationPayload>,
) -> Result<Json<UserDto>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let user = state
        .user_service
        .update_location(user_id, payload.latitude, payload.longitude)
        .await?;
    Ok(Json(UserDto::from(&user)))
}

async fn save_push_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PushTokenPayload>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .user_service
        .save_push_token(user_id, payload.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn record_swipe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SwipePayload>,
) -> Result<(StatusCode, Json<SwipeResponse>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let outcome = state
        .swipe_service
        .record_swipe(RecordSwipeRequest {
            from_user_id: user_id,
            to_user_id: payload.to_user_id,
            action: payload.action,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SwipeResponse {
            swipe: SwipeDto::from(&outcome.swipe),
            is_match: outcome.is_match,
            room: outcome.room.as_ref().map(RoomDto::from),
        }),
    ))
}

async fn list_matches(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MatchDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let matches = state.swipe_service.list_matches(user_id).await?;
    Ok(Json(matches.iter().map(MatchDto::from).collect()))
}

async fn get_suggestions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SuggestionsQuery>,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let limit = query
        .limit
        .unwrap_or(application::services::DEFAULT_SUGGESTION_LIMIT)
        .min(100);
    let suggestions = state.suggestion_service.rank(user_id, limit).await?;
    Ok(Json(suggestions.iter().map(UserDto::from).collect()))
}

async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RoomDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let rooms = state.chat_service.list_rooms(user_id).await?;
    Ok(Json(rooms.iter().map(RoomDto::from).collect()))
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let message = state
        .chat_service
        .send_message(SendMessageRequest {
            room_id,
            sender_id: user_id,
            content: payload.content,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(MessageDto::from(&message))))
}

async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let messages = state.chat_service.list_messages(room_id, user_id).await?;
    Ok(Json(messages.iter().map(MessageDto::from).collect()))
}

async fn reset_stale_quotas(
    State(state): State<AppState>,
) -> Result<Json<QuotaResetResponse>, ApiError> {
    let affected = state.quota_service.reset_stale().await?;
    Ok(Json(QuotaResetResponse { affected }))
}
