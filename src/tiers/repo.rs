use anyhow::Context;
use sqlx::PgExecutor;

use super::repo_types::{SupportTier, TierChanges, TierId};
use crate::petitions::repo_types::PetitionId;

pub async fn list_by_petition(
    db: impl PgExecutor<'_>,
    petition_id: PetitionId,
) -> anyhow::Result<Vec<SupportTier>> {
    let rows = sqlx::query_as::<_, SupportTier>(
        r#"
        SELECT id, petition_id, title, description, cost
          FROM support_tier
         WHERE petition_id = $1
         ORDER BY id
        "#,
    )
    .bind(petition_id)
    .fetch_all(db)
    .await
    .context("list tiers by petition")?;
    Ok(rows)
}

pub async fn insert(
    db: impl PgExecutor<'_>,
    petition_id: PetitionId,
    title: &str,
    description: &str,
    cost: i32,
) -> anyhow::Result<TierId> {
    let (id,) = sqlx::query_as::<_, (TierId,)>(
        r#"
        INSERT INTO support_tier (petition_id, title, description, cost)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(petition_id)
    .bind(title)
    .bind(description)
    .bind(cost)
    .fetch_one(db)
    .await
    .context("insert support tier")?;
    Ok(id)
}

pub async fn update(db: impl PgExecutor<'_>, id: TierId, changes: &TierChanges) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE support_tier
           SET title       = COALESCE($2, title),
               description = COALESCE($3, description),
               cost        = COALESCE($4, cost)
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(changes.title.as_deref())
    .bind(changes.description.as_deref())
    .bind(changes.cost)
    .execute(db)
    .await
    .context("update support tier")?;
    Ok(())
}

pub async fn delete(db: impl PgExecutor<'_>, id: TierId) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM support_tier WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete support tier")?;
    Ok(())
}

pub async fn count_supporters(db: impl PgExecutor<'_>, id: TierId) -> anyhow::Result<i64> {
    let (n,) = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM supporter WHERE support_tier_id = $1",
    )
    .bind(id)
    .fetch_one(db)
    .await
    .context("count tier supporters")?;
    Ok(n)
}
