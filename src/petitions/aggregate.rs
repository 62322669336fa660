use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;

use super::{
    repo,
    repo_types::{CategoryId, PetitionId, PetitionWithOwner},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    tiers::{
        repo as tiers_repo,
        repo_types::{SupportTier, TierId},
    },
    users::repo_types::UserId,
};

/// Full view of one petition.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PetitionDetail {
    pub petition_id: PetitionId,
    pub title: String,
    pub category_id: CategoryId,
    pub owner_id: UserId,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub number_of_supporters: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub creation_date: OffsetDateTime,
    pub description: String,
    pub money_raised: i64,
    pub support_tiers: Vec<SupportTier>,
}

/// `supported` holds the tier of every support event, one entry per event.
pub fn assemble(
    petition: PetitionWithOwner,
    tiers: Vec<SupportTier>,
    supported: &[TierId],
) -> PetitionDetail {
    let cost_of: HashMap<TierId, i64> = tiers.iter().map(|t| (t.id, i64::from(t.cost))).collect();
    let money_raised = supported
        .iter()
        .filter_map(|tier_id| cost_of.get(tier_id))
        .sum();

    PetitionDetail {
        petition_id: petition.id,
        title: petition.title,
        category_id: petition.category_id,
        owner_id: petition.owner_id,
        owner_first_name: petition.owner_first_name,
        owner_last_name: petition.owner_last_name,
        number_of_supporters: supported.len() as i64,
        creation_date: petition.creation_date,
        description: petition.description,
        money_raised,
        support_tiers: tiers,
    }
}

pub async fn load(st: &AppState, id: PetitionId) -> AppResult<PetitionDetail> {
    let petition = repo::find_with_owner(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no petition with id {id}")))?;
    let tiers = tiers_repo::list_by_petition(&st.db, id).await?;
    let supported = repo::supported_tier_ids(&st.db, id).await?;
    Ok(assemble(petition, tiers, &supported))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn petition() -> PetitionWithOwner {
        PetitionWithOwner {
            id: 1,
            title: "Save the kiwi".into(),
            description: "Predator-free by 2050".into(),
            category_id: 1,
            owner_id: 10,
            owner_first_name: "Ana".into(),
            owner_last_name: "Ngata".into(),
            creation_date: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn tier(id: TierId, cost: i32) -> SupportTier {
        SupportTier {
            id,
            petition_id: 1,
            title: format!("tier {id}"),
            description: String::new(),
            cost,
        }
    }

    #[test]
    fn money_raised_counts_every_support_event() {
        let detail = assemble(petition(), vec![tier(1, 5), tier(2, 10)], &[2, 2, 2, 1]);
        assert_eq!(detail.number_of_supporters, 4);
        assert_eq!(detail.money_raised, 3 * 10 + 5);
    }

    #[test]
    fn unsupported_tiers_are_still_listed() {
        let detail = assemble(petition(), vec![tier(1, 5), tier(2, 10), tier(3, 0)], &[1]);
        assert_eq!(detail.support_tiers.len(), 3);
        assert_eq!(detail.money_raised, 5);
    }

    #[test]
    fn no_supporters_means_nothing_raised() {
        let detail = assemble(petition(), vec![tier(1, 5)], &[]);
        assert_eq!(detail.number_of_supporters, 0);
        assert_eq!(detail.money_raised, 0);
    }

    #[test]
    fn serializes_camel_case_with_tier_ids() {
        let detail = assemble(petition(), vec![tier(4, 5)], &[4]);
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["petitionId"], 1);
        assert_eq!(json["moneyRaised"], 5);
        assert_eq!(json["supportTiers"][0]["supportTierId"], 4);
        assert!(json["supportTiers"][0].get("petitionId").is_none());
        assert_eq!(json["creationDate"], "1970-01-01T00:00:00Z");
    }
}
