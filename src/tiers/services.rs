use anyhow::Context;
use tracing::{info, warn};

use super::{
    dto::{NewTier, PatchTierRequest},
    repo,
    repo_types::{SupportTier, TierChanges, TierId},
};
use crate::{
    error::{AppError, AppResult},
    petitions::{repo as petitions_repo, repo_types::PetitionId},
    policy::{self, authorize, Capability, Resource},
    state::AppState,
    users::repo_types::UserId,
};

pub fn validate_new_tier(tier: &NewTier) -> AppResult<()> {
    if tier.title.trim().is_empty() {
        return Err(AppError::bad_request("support tier title must not be empty"));
    }
    if tier.cost < 0 {
        return Err(AppError::bad_request("support tier cost must not be negative"));
    }
    Ok(())
}

/// Fields of `req` that are supplied and differ from `current`.
pub fn diff_tier(current: &SupportTier, req: &PatchTierRequest) -> AppResult<TierChanges> {
    let mut changes = TierChanges::default();
    if let Some(title) = req.title.as_deref() {
        if title.trim().is_empty() {
            return Err(AppError::bad_request("support tier title must not be empty"));
        }
        if title != current.title {
            changes.title = Some(title.to_string());
        }
    }
    if let Some(description) = req.description.as_deref() {
        if description != current.description {
            changes.description = Some(description.to_string());
        }
    }
    if let Some(cost) = req.cost {
        if cost < 0 {
            return Err(AppError::bad_request("support tier cost must not be negative"));
        }
        if cost != current.cost {
            changes.cost = Some(cost);
        }
    }
    Ok(changes)
}

fn find_tier(tiers: &[SupportTier], tier_id: TierId) -> AppResult<&SupportTier> {
    tiers
        .iter()
        .find(|t| t.id == tier_id)
        .ok_or_else(|| AppError::not_found(format!("no support tier with id {tier_id}")))
}

pub async fn add(
    st: &AppState,
    actor: UserId,
    petition_id: PetitionId,
    tier: NewTier,
) -> AppResult<TierId> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    let petition = petitions_repo::lock(&mut *tx, petition_id).await?;
    authorize(actor, Resource::Petition { owner_id: petition.owner_id }, Capability::Modify)?;
    validate_new_tier(&tier)?;

    let existing = repo::list_by_petition(&mut *tx, petition_id).await?;
    policy::check_tier_addable(&existing, &tier.title)?;

    let id = repo::insert(&mut *tx, petition_id, &tier.title, &tier.description, tier.cost).await?;
    tx.commit().await.context("commit tx")?;
    info!(petition_id, tier_id = id, "support tier added");
    Ok(id)
}

pub async fn edit(
    st: &AppState,
    actor: UserId,
    petition_id: PetitionId,
    tier_id: TierId,
    req: PatchTierRequest,
) -> AppResult<()> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    let petition = petitions_repo::lock(&mut *tx, petition_id).await?;
    authorize(actor, Resource::Petition { owner_id: petition.owner_id }, Capability::Modify)?;

    let tiers = repo::list_by_petition(&mut *tx, petition_id).await?;
    let current = find_tier(&tiers, tier_id)?;
    policy::check_tier_unsupported(repo::count_supporters(&mut *tx, tier_id).await?)?;

    let changes = diff_tier(current, &req)?;
    if let Some(title) = changes.title.as_deref() {
        policy::check_tier_title_free(&tiers, Some(tier_id), title)?;
    }
    if changes.is_empty() {
        return Ok(());
    }
    repo::update(&mut *tx, tier_id, &changes).await?;
    tx.commit().await.context("commit tx")?;
    info!(petition_id, tier_id, "support tier updated");
    Ok(())
}

pub async fn delete(
    st: &AppState,
    actor: UserId,
    petition_id: PetitionId,
    tier_id: TierId,
) -> AppResult<()> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    let petition = petitions_repo::lock(&mut *tx, petition_id).await?;
    authorize(actor, Resource::Petition { owner_id: petition.owner_id }, Capability::Modify)?;

    let tiers = repo::list_by_petition(&mut *tx, petition_id).await?;
    find_tier(&tiers, tier_id)?;
    policy::check_tier_unsupported(repo::count_supporters(&mut *tx, tier_id).await?)?;
    if let Err(e) = policy::check_tier_removable(tiers.len()) {
        warn!(petition_id, tier_id, "refusing to remove last support tier");
        return Err(e);
    }

    repo::delete(&mut *tx, tier_id).await?;
    tx.commit().await.context("commit tx")?;
    info!(petition_id, tier_id, "support tier deleted");
    Ok(())
}
