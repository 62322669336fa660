use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::users::repo_types::UserId;

pub type PetitionId = i32;
pub type CategoryId = i32;

/// The columns write paths check and diff against.
#[derive(Debug, Clone, FromRow)]
pub struct Petition {
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
    pub owner_id: UserId,
    pub image_filename: Option<String>,
}

/// Petition joined with its owner's public name.
#[derive(Debug, Clone, FromRow)]
pub struct PetitionWithOwner {
    pub id: PetitionId,
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
    pub owner_id: UserId,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub creation_date: OffsetDateTime,
}

/// One row of a search result.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PetitionSummary {
    pub petition_id: PetitionId,
    pub title: String,
    pub category_id: CategoryId,
    pub owner_id: UserId,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub number_of_supporters: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub creation_date: OffsetDateTime,
    /// Cheapest tier of the petition.
    pub supporting_cost: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub category_id: CategoryId,
    pub name: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PetitionChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl PetitionChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.category_id.is_none()
    }
}
