use anyhow::Context;
use tracing::{info, warn};

use super::{dto::AddSupporterRequest, repo, repo_types::SupporterEntry};
use crate::{
    error::{AppError, AppResult},
    petitions::{repo as petitions_repo, repo_types::PetitionId},
    policy::{self, authorize, Capability, Resource},
    state::AppState,
    tiers::repo as tiers_repo,
    users::repo_types::UserId,
};

pub async fn list(st: &AppState, petition_id: PetitionId) -> AppResult<Vec<SupporterEntry>> {
    if petitions_repo::find(&st.db, petition_id).await?.is_none() {
        return Err(AppError::not_found(format!("no petition with id {petition_id}")));
    }
    Ok(repo::list_by_petition(&st.db, petition_id).await?)
}

/// Append a support event. The petition row stays locked from the first
/// check to the insert; the `(user_id, support_tier_id)` unique key backs
/// up the duplicate check.
pub async fn add(
    st: &AppState,
    actor: UserId,
    petition_id: PetitionId,
    req: AddSupporterRequest,
) -> AppResult<i32> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    let petition = petitions_repo::lock(&mut *tx, petition_id).await?;

    let tiers = tiers_repo::list_by_petition(&mut *tx, petition_id).await?;
    if !tiers.iter().any(|t| t.id == req.support_tier_id) {
        return Err(AppError::not_found(format!(
            "no support tier with id {} on petition {petition_id}",
            req.support_tier_id
        )));
    }
    let resource = Resource::Petition { owner_id: petition.owner_id };
    if let Err(e) = authorize(actor, resource, Capability::Support) {
        warn!(petition_id, user_id = actor, "owner tried to support own petition");
        return Err(e);
    }
    let already = repo::tiers_supported_by(&mut *tx, petition_id, actor).await?;
    policy::check_not_already_supported(&already, req.support_tier_id)?;

    let id = repo::insert(&mut *tx, petition_id, req.support_tier_id, actor, req.message()).await?;
    tx.commit().await.context("commit tx")?;
    info!(petition_id, tier_id = req.support_tier_id, user_id = actor, "petition supported");
    Ok(id)
}
