//! Rows for tests that run against a migrated database.

use sqlx::PgPool;

use crate::{
    petitions::{
        repo as petitions_repo,
        repo_types::{CategoryId, PetitionId},
    },
    supporters::repo as supporters_repo,
    tiers::{repo as tiers_repo, repo_types::TierId},
    users::repo_types::{User, UserId},
};

/// First seeded category.
pub const CATEGORY: CategoryId = 1;

pub async fn user(db: &PgPool, name: &str) -> UserId {
    User::create(db, &format!("{name}@example.com"), name, "Tester", "unused-hash")
        .await
        .unwrap()
}

/// Petition with `(title, cost)` tiers; tier ids come back in the given order.
pub async fn petition(
    db: &PgPool,
    owner: UserId,
    title: &str,
    tiers: &[(&str, i32)],
) -> (PetitionId, Vec<TierId>) {
    let id = petitions_repo::insert(db, title, &format!("about {title}"), CATEGORY, owner)
        .await
        .unwrap();
    let mut tier_ids = Vec::with_capacity(tiers.len());
    for (tier, cost) in tiers {
        let tier_id = tiers_repo::insert(db, id, tier, &format!("{tier} tier"), *cost)
            .await
            .unwrap();
        tier_ids.push(tier_id);
    }
    (id, tier_ids)
}

pub async fn support(db: &PgPool, petition_id: PetitionId, tier_id: TierId, user_id: UserId) {
    supporters_repo::insert(db, petition_id, tier_id, user_id, None)
        .await
        .unwrap();
}

pub async fn count(db: &PgPool, table: &str) -> i64 {
    let (n,) = sqlx::query_as::<_, (i64,)>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db)
        .await
        .unwrap();
    n
}
