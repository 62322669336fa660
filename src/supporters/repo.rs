use anyhow::Context;
use sqlx::{PgExecutor, PgPool};

use super::repo_types::SupporterEntry;
use crate::{
    petitions::repo_types::PetitionId, tiers::repo_types::TierId, users::repo_types::UserId,
};

/// Supporters of a petition, newest first.
pub async fn list_by_petition(db: &PgPool, petition_id: PetitionId) -> anyhow::Result<Vec<SupporterEntry>> {
    let rows = sqlx::query_as::<_, SupporterEntry>(
        r#"
        SELECT s.id AS support_id,
               s.support_tier_id,
               s.message,
               s.user_id AS supporter_id,
               u.first_name AS supporter_first_name,
               u.last_name AS supporter_last_name,
               s.created_at AS timestamp
          FROM supporter s
          JOIN users u ON u.id = s.user_id
         WHERE s.petition_id = $1
         ORDER BY s.created_at DESC, s.id DESC
        "#,
    )
    .bind(petition_id)
    .fetch_all(db)
    .await
    .context("list supporters")?;
    Ok(rows)
}

/// Tiers of `petition_id` that `user_id` already backs.
pub async fn tiers_supported_by(
    db: impl PgExecutor<'_>,
    petition_id: PetitionId,
    user_id: UserId,
) -> anyhow::Result<Vec<TierId>> {
    let rows = sqlx::query_as::<_, (TierId,)>(
        "SELECT support_tier_id FROM supporter WHERE petition_id = $1 AND user_id = $2",
    )
    .bind(petition_id)
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list tiers supported by user")?;
    Ok(rows.into_iter().map(|(t,)| t).collect())
}

pub async fn insert(
    db: impl PgExecutor<'_>,
    petition_id: PetitionId,
    tier_id: TierId,
    user_id: UserId,
    message: Option<&str>,
) -> anyhow::Result<i32> {
    let (id,) = sqlx::query_as::<_, (i32,)>(
        r#"
        INSERT INTO supporter (petition_id, support_tier_id, user_id, message)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(petition_id)
    .bind(tier_id)
    .bind(user_id)
    .bind(message)
    .fetch_one(db)
    .await
    .context("insert supporter")?;
    Ok(id)
}
