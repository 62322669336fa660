use anyhow::Context;
use tracing::{info, warn};

use super::{
    dto::{CreatePetitionRequest, PatchPetitionRequest, SearchParams},
    pagination::{paginate, Page},
    query,
    repo,
    repo_types::{Petition, PetitionChanges, PetitionId, PetitionSummary},
};
use crate::{
    error::{AppError, AppResult},
    policy::{self, authorize, Capability, Resource},
    state::AppState,
    tiers::{repo as tiers_repo, services::validate_new_tier},
    users::repo_types::UserId,
};

pub async fn search(st: &AppState, params: &SearchParams) -> AppResult<Page<PetitionSummary>> {
    let results = query::search(&st.db, &params.filters).await?;
    paginate(results, params.start_index, params.count)
}

fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Structural checks on a create request that need no storage.
pub fn validate_create(req: &CreatePetitionRequest) -> AppResult<()> {
    require_text(&req.title, "title")?;
    require_text(&req.description, "description")?;
    policy::check_new_tiers(req.support_tiers.iter().map(|t| t.title.as_str()))?;
    req.support_tiers.iter().try_for_each(validate_new_tier)
}

pub async fn create(st: &AppState, owner: UserId, req: CreatePetitionRequest) -> AppResult<PetitionId> {
    if !repo::category_exists(&st.db, req.category_id).await? {
        warn!(category_id = req.category_id, "unknown category");
        return Err(AppError::bad_request(format!(
            "category with id {} does not exist",
            req.category_id
        )));
    }
    validate_create(&req)?;
    if repo::title_taken(&st.db, &req.title, None).await? {
        return Err(AppError::conflict("petition title already in use"));
    }

    // petition and tiers land together or not at all
    let mut tx = st.db.begin().await.context("begin tx")?;
    let id = repo::insert(&mut *tx, &req.title, &req.description, req.category_id, owner).await?;
    for tier in &req.support_tiers {
        tiers_repo::insert(&mut *tx, id, &tier.title, &tier.description, tier.cost).await?;
    }
    tx.commit().await.context("commit tx")?;

    info!(petition_id = id, owner_id = owner, tiers = req.support_tiers.len(), "petition created");
    Ok(id)
}

/// Fields of `req` that are supplied and differ from `current`.
pub fn diff_petition(current: &Petition, req: &PatchPetitionRequest) -> AppResult<PetitionChanges> {
    let mut changes = PetitionChanges::default();
    if let Some(title) = req.title.as_deref() {
        require_text(title, "title")?;
        if title != current.title {
            changes.title = Some(title.to_string());
        }
    }
    if let Some(description) = req.description.as_deref() {
        require_text(description, "description")?;
        if description != current.description {
            changes.description = Some(description.to_string());
        }
    }
    if let Some(category_id) = req.category_id {
        if category_id != current.category_id {
            changes.category_id = Some(category_id);
        }
    }
    Ok(changes)
}

pub async fn edit(
    st: &AppState,
    actor: UserId,
    id: PetitionId,
    req: PatchPetitionRequest,
) -> AppResult<()> {
    let current = repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no petition with id {id}")))?;
    authorize(actor, Resource::Petition { owner_id: current.owner_id }, Capability::Modify)?;

    let changes = diff_petition(&current, &req)?;
    if let Some(category_id) = changes.category_id {
        if !repo::category_exists(&st.db, category_id).await? {
            return Err(AppError::bad_request(format!(
                "category with id {category_id} does not exist"
            )));
        }
    }
    if let Some(title) = changes.title.as_deref() {
        if repo::title_taken(&st.db, title, Some(id)).await? {
            return Err(AppError::conflict("petition title already in use"));
        }
    }
    if changes.is_empty() {
        return Ok(());
    }

    repo::update(&st.db, id, &changes).await?;
    info!(petition_id = id, "petition updated");
    Ok(())
}

pub async fn delete(st: &AppState, actor: UserId, id: PetitionId) -> AppResult<()> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    let petition = repo::lock(&mut *tx, id).await?;
    authorize(actor, Resource::Petition { owner_id: petition.owner_id }, Capability::Modify)?;
    policy::check_petition_deletable(repo::count_supporters(&mut *tx, id).await?)?;

    repo::delete(&mut *tx, id).await?;
    tx.commit().await.context("commit tx")?;
    info!(petition_id = id, "petition deleted");

    if let Some(key) = petition.image_filename {
        if let Err(e) = st.storage.delete_object(&key).await {
            warn!(error = %e, petition_id = id, %key, "orphaned hero image");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fixtures,
        petitions::{aggregate, query::SearchFilters},
        tiers::dto::NewTier,
    };
    use sqlx::PgPool;

    fn tier(title: &str, cost: i32) -> NewTier {
        NewTier {
            title: title.into(),
            description: format!("{title} tier"),
            cost,
        }
    }

    fn create_req(tiers: Vec<NewTier>) -> CreatePetitionRequest {
        CreatePetitionRequest {
            title: "A".into(),
            description: "Plant more trees".into(),
            category_id: 1,
            support_tiers: tiers,
        }
    }

    fn current() -> Petition {
        Petition {
            title: "A".into(),
            description: "Plant more trees".into(),
            category_id: 2,
            owner_id: 10,
            image_filename: None,
        }
    }

    #[test]
    fn create_accepts_one_to_three_tiers() {
        assert!(validate_create(&create_req(vec![tier("T1", 5), tier("T2", 10)])).is_ok());
    }

    #[test]
    fn create_with_four_tiers_is_bad_request() {
        let req = create_req(vec![tier("a", 1), tier("b", 2), tier("c", 3), tier("d", 4)]);
        assert!(matches!(validate_create(&req), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn create_without_tiers_is_bad_request() {
        assert!(matches!(validate_create(&create_req(vec![])), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn create_with_duplicate_tier_titles_is_conflict() {
        let req = create_req(vec![tier("same", 1), tier("same", 2)]);
        assert!(matches!(validate_create(&req), Err(AppError::Conflict(_))));
    }

    #[test]
    fn create_rejects_blank_title_and_negative_cost() {
        let mut req = create_req(vec![tier("a", 1)]);
        req.title = " ".into();
        assert!(matches!(validate_create(&req), Err(AppError::BadRequest(_))));
        assert!(matches!(
            validate_create(&create_req(vec![tier("a", -1)])),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn diff_keeps_only_changed_fields() {
        let req = PatchPetitionRequest {
            title: Some("A".into()),
            description: Some("Plant even more trees".into()),
            category_id: Some(2),
        };
        assert_eq!(
            diff_petition(&current(), &req).unwrap(),
            PetitionChanges {
                title: None,
                description: Some("Plant even more trees".into()),
                category_id: None,
            }
        );
    }

    #[test]
    fn identical_edit_is_a_no_op() {
        let req = PatchPetitionRequest {
            title: Some("A".into()),
            description: Some("Plant more trees".into()),
            category_id: Some(2),
        };
        assert!(diff_petition(&current(), &req).unwrap().is_empty());
        assert!(diff_petition(&current(), &PatchPetitionRequest::default())
            .unwrap()
            .is_empty());
    }

    fn filtered(filters: SearchFilters) -> SearchParams {
        SearchParams {
            filters,
            ..Default::default()
        }
    }

    fn ids(page: &Page<PetitionSummary>) -> Vec<PetitionId> {
        page.items.iter().map(|p| p.petition_id).collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn cost_ceiling_needs_one_tier_within_it(pool: PgPool) {
        let st = AppState::with_pool(pool);
        let owner = fixtures::user(&st.db, "ana").await;
        let id = create(&st, owner, create_req(vec![tier("T1", 5), tier("T2", 10)]))
            .await
            .unwrap();

        let at_most = |cost| {
            filtered(SearchFilters {
                supporting_cost: Some(cost),
                ..Default::default()
            })
        };
        assert_eq!(ids(&search(&st, &at_most(7)).await.unwrap()), vec![id]);
        assert_eq!(ids(&search(&st, &at_most(10)).await.unwrap()), vec![id]);
        assert!(search(&st, &at_most(3)).await.unwrap().items.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn search_lists_each_petition_once(pool: PgPool) {
        let st = AppState::with_pool(pool);
        let owner = fixtures::user(&st.db, "ana").await;
        let (a, a_tiers) =
            fixtures::petition(&st.db, owner, "Kiwi", &[("x", 1), ("y", 2), ("z", 3)]).await;
        let (b, _) = fixtures::petition(&st.db, owner, "Kauri", &[("x", 50)]).await;
        let mut fans = Vec::new();
        for name in ["bo", "cy", "di", "ed", "fi"] {
            let fan = fixtures::user(&st.db, name).await;
            for &tier_id in &a_tiers {
                fixtures::support(&st.db, a, tier_id, fan).await;
            }
            fans.push(fan);
        }

        let all = search(&st, &SearchParams::default()).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(ids(&all), vec![a, b]);
        assert_eq!(all.items[0].number_of_supporters, 15);
        assert_eq!(all.items[0].supporting_cost, 1);

        let joined = filtered(SearchFilters {
            supporting_cost: Some(100),
            supporter_id: Some(i64::from(fans[0])),
            ..Default::default()
        });
        let page = search(&st, &joined).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(ids(&page), vec![a]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn rejected_create_leaves_no_rows(pool: PgPool) {
        let st = AppState::with_pool(pool);
        let owner = fixtures::user(&st.db, "ana").await;

        let four = create_req(vec![tier("a", 1), tier("b", 2), tier("c", 3), tier("d", 4)]);
        assert!(matches!(create(&st, owner, four).await, Err(AppError::BadRequest(_))));
        let twins = create_req(vec![tier("same", 1), tier("same", 2)]);
        assert!(matches!(create(&st, owner, twins).await, Err(AppError::Conflict(_))));
        let mut nowhere = create_req(vec![tier("a", 1)]);
        nowhere.category_id = 9999;
        assert!(matches!(create(&st, owner, nowhere).await, Err(AppError::BadRequest(_))));

        assert_eq!(fixtures::count(&st.db, "petition").await, 0);
        assert_eq!(fixtures::count(&st.db, "support_tier").await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn petition_titles_are_unique(pool: PgPool) {
        let st = AppState::with_pool(pool);
        let owner = fixtures::user(&st.db, "ana").await;
        create(&st, owner, create_req(vec![tier("a", 1)])).await.unwrap();
        assert!(matches!(
            create(&st, owner, create_req(vec![tier("b", 2)])).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(fixtures::count(&st.db, "petition").await, 1);
        assert_eq!(fixtures::count(&st.db, "support_tier").await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn supported_petition_cannot_be_deleted(pool: PgPool) {
        let st = AppState::with_pool(pool);
        let owner = fixtures::user(&st.db, "ana").await;
        let fan = fixtures::user(&st.db, "bo").await;
        let (id, tiers) = fixtures::petition(&st.db, owner, "Kiwi", &[("x", 1)]).await;
        fixtures::support(&st.db, id, tiers[0], fan).await;

        assert!(matches!(delete(&st, owner, id).await, Err(AppError::Conflict(_))));
        assert!(repo::find(&st.db, id).await.unwrap().is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn owner_deletes_unsupported_petition_with_its_tiers(pool: PgPool) {
        let st = AppState::with_pool(pool);
        let owner = fixtures::user(&st.db, "ana").await;
        let other = fixtures::user(&st.db, "bo").await;
        let (id, _) = fixtures::petition(&st.db, owner, "Kiwi", &[("x", 1), ("y", 2)]).await;

        assert!(matches!(delete(&st, other, id).await, Err(AppError::Forbidden(_))));
        delete(&st, owner, id).await.unwrap();
        assert_eq!(fixtures::count(&st.db, "petition").await, 0);
        assert_eq!(fixtures::count(&st.db, "support_tier").await, 0);
        assert!(matches!(delete(&st, owner, id).await, Err(AppError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn detail_counts_every_support_event(pool: PgPool) {
        let st = AppState::with_pool(pool);
        let owner = fixtures::user(&st.db, "ana").await;
        let bo = fixtures::user(&st.db, "bo").await;
        let cy = fixtures::user(&st.db, "cy").await;
        let (id, tiers) =
            fixtures::petition(&st.db, owner, "Kiwi", &[("T1", 5), ("T2", 10), ("T3", 99)]).await;
        fixtures::support(&st.db, id, tiers[0], bo).await;
        fixtures::support(&st.db, id, tiers[1], bo).await;
        fixtures::support(&st.db, id, tiers[1], cy).await;

        let detail = aggregate::load(&st, id).await.unwrap();
        assert_eq!(detail.number_of_supporters, 3);
        assert_eq!(detail.money_raised, 25);
        assert_eq!(detail.support_tiers.len(), 3);
        assert!(matches!(aggregate::load(&st, id + 1).await, Err(AppError::NotFound(_))));
    }
}
