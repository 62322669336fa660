use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        LoginRequest, LoginResponse, PatchUserRequest, RegisterRequest, RegisterResponse, UserView,
    },
    services,
};
use crate::{
    auth::{AuthUser, MaybeUser},
    error::AppResult,
    params::parse_id,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/:id", get(view).patch(update))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let user_id = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (user_id, token) = services::login(&state, payload).await?;
    Ok(Json(LoginResponse { user_id, token }))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> AppResult<StatusCode> {
    services::logout(&state, user_id).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state))]
pub async fn view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Json<UserView>> {
    let id = parse_id(&id, "user")?;
    Ok(Json(services::view(&state, viewer, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<PatchUserRequest>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "user")?;
    services::update(&state, actor, id, payload).await?;
    Ok(StatusCode::OK)
}
