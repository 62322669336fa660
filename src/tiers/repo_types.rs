use serde::Serialize;
use sqlx::FromRow;

use crate::petitions::repo_types::PetitionId;

pub type TierId = i32;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SupportTier {
    #[serde(rename = "supportTierId")]
    pub id: TierId,
    #[serde(skip_serializing)]
    pub petition_id: PetitionId,
    pub title: String,
    pub description: String,
    pub cost: i32,
}

/// Columns a tier edit actually changes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TierChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cost: Option<i32>,
}

impl TierChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.cost.is_none()
    }
}
