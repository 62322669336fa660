use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    aggregate::{self, PetitionDetail},
    dto::{
        CreatePetitionRequest, CreatedPetitionResponse, PatchPetitionRequest, SearchParams,
        SearchResponse,
    },
    repo,
    repo_types::Category,
    services,
};
use crate::{auth::AuthUser, error::AppResult, params::parse_id, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/petitions", get(search_petitions))
        .route("/petitions/categories", get(list_categories))
        .route("/petitions/:id", get(get_petition))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/petitions", post(create_petition))
        .route(
            "/petitions/:id",
            patch(edit_petition).delete(delete_petition),
        )
}

#[instrument(skip(state))]
pub async fn search_petitions(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<SearchResponse>> {
    let params = SearchParams::from_pairs(&pairs)?;
    let page = services::search(&state, &params).await?;
    Ok(Json(SearchResponse {
        petitions: page.items,
        count: page.total,
    }))
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(repo::list_categories(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_petition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PetitionDetail>> {
    let id = parse_id(&id, "petition")?;
    Ok(Json(aggregate::load(&state, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_petition(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Json(payload): Json<CreatePetitionRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<CreatedPetitionResponse>)> {
    let petition_id = services::create(&state, owner, payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/petitions/{petition_id}").parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    Ok((
        StatusCode::CREATED,
        headers,
        Json(CreatedPetitionResponse { petition_id }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn edit_petition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<PatchPetitionRequest>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "petition")?;
    services::edit(&state, actor, id, payload).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state))]
pub async fn delete_petition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(actor): AuthUser,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "petition")?;
    services::delete(&state, actor, id).await?;
    Ok(StatusCode::OK)
}
