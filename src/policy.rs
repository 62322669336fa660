//! Ownership checks and structural invariants shared by every mutation.
//!
//! Each check is a pure function over state the caller has already loaded,
//! so handlers evaluate them in a fixed order and stop at the first failure.

use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    tiers::repo_types::{SupportTier, TierId},
    users::repo_types::UserId,
};

pub const MIN_TIERS: usize = 1;
pub const MAX_TIERS: usize = 3;

/// What is being acted on, reduced to the fields ownership depends on.
#[derive(Debug, Clone, Copy)]
pub enum Resource {
    /// A petition, or anything owned through one (tiers, hero image).
    Petition { owner_id: UserId },
    /// A user account (profile fields, avatar).
    User { id: UserId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Edit or delete the resource or its children.
    Modify,
    /// Back a petition; owners may not support themselves.
    Support,
}

pub fn authorize(actor: UserId, resource: Resource, capability: Capability) -> AppResult<()> {
    match (resource, capability) {
        (Resource::Petition { owner_id }, Capability::Modify) if actor != owner_id => Err(
            AppError::forbidden("only the owner of a petition may change it"),
        ),
        (Resource::Petition { owner_id }, Capability::Support) if actor == owner_id => {
            Err(AppError::forbidden("cannot support your own petition"))
        }
        (Resource::User { id }, Capability::Modify) if actor != id => {
            Err(AppError::forbidden("cannot change another user's account"))
        }
        (Resource::User { .. }, Capability::Support) => {
            Err(AppError::forbidden("users cannot be supported"))
        }
        _ => Ok(()),
    }
}

/// Tier set supplied when a petition is created.
pub fn check_new_tiers<'a>(titles: impl ExactSizeIterator<Item = &'a str>) -> AppResult<()> {
    let n = titles.len();
    if !(MIN_TIERS..=MAX_TIERS).contains(&n) {
        return Err(AppError::bad_request(format!(
            "a petition needs between {MIN_TIERS} and {MAX_TIERS} support tiers, got {n}"
        )));
    }
    let mut seen = HashSet::with_capacity(n);
    for title in titles {
        if !seen.insert(title) {
            return Err(AppError::conflict(format!(
                "support tier title {title:?} is used twice"
            )));
        }
    }
    Ok(())
}

pub fn check_tier_addable(existing: &[SupportTier], title: &str) -> AppResult<()> {
    if existing.len() >= MAX_TIERS {
        return Err(AppError::conflict(format!(
            "petition already has {MAX_TIERS} support tiers"
        )));
    }
    check_tier_title_free(existing, None, title)
}

/// `title` must not belong to any tier of the petition other than `own`.
pub fn check_tier_title_free(existing: &[SupportTier], own: Option<TierId>, title: &str) -> AppResult<()> {
    let clash = existing
        .iter()
        .any(|t| Some(t.id) != own && t.title == title);
    if clash {
        return Err(AppError::conflict(format!(
            "support tier title {title:?} is not unique within the petition"
        )));
    }
    Ok(())
}

/// Supported tiers are frozen.
pub fn check_tier_unsupported(supporters: i64) -> AppResult<()> {
    if supporters > 0 {
        return Err(AppError::conflict(
            "support tier already has supporters and can no longer change",
        ));
    }
    Ok(())
}

pub fn check_tier_removable(tier_count: usize) -> AppResult<()> {
    if tier_count <= MIN_TIERS {
        return Err(AppError::conflict(
            "cannot remove the only support tier of a petition",
        ));
    }
    Ok(())
}

pub fn check_petition_deletable(supporters: i64) -> AppResult<()> {
    if supporters > 0 {
        return Err(AppError::conflict("cannot delete a petition that has supporters"));
    }
    Ok(())
}

/// `already` holds the tiers this user already backs on the petition.
pub fn check_not_already_supported(already: &[TierId], tier_id: TierId) -> AppResult<()> {
    if already.contains(&tier_id) {
        return Err(AppError::conflict("already supporting this petition at this tier"));
    }
    Ok(())
}
