use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{dto::AddSupporterRequest, repo_types::SupporterEntry, services};
use crate::{auth::AuthUser, error::AppResult, params::parse_id, state::AppState};

pub fn supporter_routes() -> Router<AppState> {
    Router::new().route(
        "/petitions/:id/supporters",
        get(list_supporters).post(add_supporter),
    )
}

#[instrument(skip(state))]
pub async fn list_supporters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<SupporterEntry>>> {
    let petition_id = parse_id(&id, "petition")?;
    Ok(Json(services::list(&state, petition_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn add_supporter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<AddSupporterRequest>,
) -> AppResult<StatusCode> {
    let petition_id = parse_id(&id, "petition")?;
    services::add(&state, actor, petition_id, payload).await?;
    Ok(StatusCode::CREATED)
}
