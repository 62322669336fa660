use anyhow::Context;
use sqlx::{PgExecutor, PgPool};

use super::repo_types::{
    Category, CategoryId, Petition, PetitionChanges, PetitionId, PetitionWithOwner,
};
use crate::{
    error::{AppError, AppResult},
    users::repo_types::UserId,
};

const PETITION_COLUMNS: &str = "title, description, category_id, owner_id, image_filename";

pub async fn find(db: impl PgExecutor<'_>, id: PetitionId) -> anyhow::Result<Option<Petition>> {
    let row = sqlx::query_as::<_, Petition>(&format!(
        "SELECT {PETITION_COLUMNS} FROM petition WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find petition")?;
    Ok(row)
}

/// Load the petition and hold its row lock until the surrounding
/// transaction ends. Every check-then-write on a petition's tiers or
/// supporters starts here, which serialises them per petition.
pub async fn lock(db: impl PgExecutor<'_>, id: PetitionId) -> AppResult<Petition> {
    sqlx::query_as::<_, Petition>(&format!(
        "SELECT {PETITION_COLUMNS} FROM petition WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("lock petition")?
    .ok_or_else(|| AppError::not_found(format!("no petition with id {id}")))
}

pub async fn find_with_owner(
    db: &PgPool,
    id: PetitionId,
) -> anyhow::Result<Option<PetitionWithOwner>> {
    let row = sqlx::query_as::<_, PetitionWithOwner>(
        r#"
        SELECT p.id, p.title, p.description, p.category_id, p.owner_id,
               u.first_name AS owner_first_name, u.last_name AS owner_last_name,
               p.creation_date
          FROM petition p
          JOIN users u ON u.id = p.owner_id
         WHERE p.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find petition with owner")?;
    Ok(row)
}

/// Is `title` used by a petition other than `except`?
pub async fn title_taken(
    db: impl PgExecutor<'_>,
    title: &str,
    except: Option<PetitionId>,
) -> anyhow::Result<bool> {
    let (taken,) = sqlx::query_as::<_, (bool,)>(
        "SELECT EXISTS (SELECT 1 FROM petition WHERE title = $1 AND id IS DISTINCT FROM $2)",
    )
    .bind(title)
    .bind(except)
    .fetch_one(db)
    .await
    .context("check petition title")?;
    Ok(taken)
}

pub async fn insert(
    db: impl PgExecutor<'_>,
    title: &str,
    description: &str,
    category_id: CategoryId,
    owner_id: UserId,
) -> anyhow::Result<PetitionId> {
    let (id,) = sqlx::query_as::<_, (PetitionId,)>(
        r#"
        INSERT INTO petition (title, description, category_id, owner_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(category_id)
    .bind(owner_id)
    .fetch_one(db)
    .await
    .context("insert petition")?;
    Ok(id)
}

pub async fn update(
    db: impl PgExecutor<'_>,
    id: PetitionId,
    changes: &PetitionChanges,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE petition
           SET title       = COALESCE($2, title),
               description = COALESCE($3, description),
               category_id = COALESCE($4, category_id)
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(changes.title.as_deref())
    .bind(changes.description.as_deref())
    .bind(changes.category_id)
    .execute(db)
    .await
    .context("update petition")?;
    Ok(())
}

pub async fn delete(db: impl PgExecutor<'_>, id: PetitionId) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM petition WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete petition")?;
    Ok(())
}

pub async fn count_supporters(db: impl PgExecutor<'_>, id: PetitionId) -> anyhow::Result<i64> {
    let (n,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM supporter WHERE petition_id = $1")
        .bind(id)
        .fetch_one(db)
        .await
        .context("count petition supporters")?;
    Ok(n)
}

/// Tier id of every support event on the petition, one entry per event.
pub async fn supported_tier_ids(db: &PgPool, id: PetitionId) -> anyhow::Result<Vec<i32>> {
    let rows = sqlx::query_as::<_, (i32,)>(
        "SELECT support_tier_id FROM supporter WHERE petition_id = $1",
    )
    .bind(id)
    .fetch_all(db)
    .await
    .context("list supported tiers")?;
    Ok(rows.into_iter().map(|(t,)| t).collect())
}

pub async fn set_image_filename(
    db: &PgPool,
    id: PetitionId,
    filename: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE petition SET image_filename = $2 WHERE id = $1")
        .bind(id)
        .bind(filename)
        .execute(db)
        .await
        .context("set petition image filename")?;
    Ok(())
}

pub async fn list_categories(db: &PgPool) -> anyhow::Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, Category>(
        "SELECT id AS category_id, name FROM category ORDER BY id",
    )
    .fetch_all(db)
    .await
    .context("list categories")?;
    Ok(rows)
}

pub async fn category_exists(db: impl PgExecutor<'_>, id: CategoryId) -> anyhow::Result<bool> {
    let (exists,) =
        sqlx::query_as::<_, (bool,)>("SELECT EXISTS (SELECT 1 FROM category WHERE id = $1)")
            .bind(id)
            .fetch_one(db)
            .await
            .context("check category")?;
    Ok(exists)
}
