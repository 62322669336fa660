use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{NewTier, PatchTierRequest},
    services,
};
use crate::{auth::AuthUser, error::AppResult, params::parse_id, state::AppState};

pub fn tier_routes() -> Router<AppState> {
    Router::new()
        .route("/petitions/:id/supportTiers", put(add_tier))
        .route(
            "/petitions/:id/supportTiers/:tier_id",
            patch(edit_tier).delete(delete_tier),
        )
}

#[instrument(skip(state, payload))]
pub async fn add_tier(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<NewTier>,
) -> AppResult<StatusCode> {
    let petition_id = parse_id(&id, "petition")?;
    services::add(&state, actor, petition_id, payload).await?;
    Ok(StatusCode::CREATED)
}

#[instrument(skip(state, payload))]
pub async fn edit_tier(
    State(state): State<AppState>,
    Path((id, tier_id)): Path<(String, String)>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<PatchTierRequest>,
) -> AppResult<StatusCode> {
    let petition_id = parse_id(&id, "petition")?;
    let tier_id = parse_id(&tier_id, "support tier")?;
    services::edit(&state, actor, petition_id, tier_id, payload).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state))]
pub async fn delete_tier(
    State(state): State<AppState>,
    Path((id, tier_id)): Path<(String, String)>,
    AuthUser(actor): AuthUser,
) -> AppResult<StatusCode> {
    let petition_id = parse_id(&id, "petition")?;
    let tier_id = parse_id(&tier_id, "support tier")?;
    services::delete(&state, actor, petition_id, tier_id).await?;
    Ok(StatusCode::OK)
}
