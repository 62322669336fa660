use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::Redirect,
    routing::get,
    Router,
};
use bytes::Bytes;
use tracing::instrument;

use super::services;
use crate::{auth::AuthUser, error::AppResult, params::parse_id, state::AppState};

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/petitions/:id/image",
            get(get_petition_image).put(put_petition_image),
        )
        .route(
            "/users/:id/image",
            get(get_user_image)
                .put(put_user_image)
                .delete(delete_user_image),
        )
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// 307 to a presigned url for the hero image.
#[instrument(skip(state))]
pub async fn get_petition_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let id = parse_id(&id, "petition")?;
    let url = services::petition_image_url(&state, id).await?;
    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state, headers, body))]
pub async fn put_petition_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(actor): AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "petition")?;
    let outcome = services::set_petition_image(&state, actor, id, content_type(&headers), body).await?;
    Ok(outcome.status())
}

#[instrument(skip(state))]
pub async fn get_user_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let id = parse_id(&id, "user")?;
    let url = services::user_image_url(&state, id).await?;
    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state, headers, body))]
pub async fn put_user_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(actor): AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "user")?;
    let outcome = services::set_user_image(&state, actor, id, content_type(&headers), body).await?;
    Ok(outcome.status())
}

#[instrument(skip(state))]
pub async fn delete_user_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(actor): AuthUser,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "user")?;
    services::delete_user_image(&state, actor, id).await?;
    Ok(StatusCode::OK)
}
