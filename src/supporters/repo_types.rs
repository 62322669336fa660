use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::{tiers::repo_types::TierId, users::repo_types::UserId};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SupporterEntry {
    pub support_id: i32,
    pub support_tier_id: TierId,
    pub message: Option<String>,
    pub supporter_id: UserId,
    pub supporter_first_name: String,
    pub supporter_last_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
