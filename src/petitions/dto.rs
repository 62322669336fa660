use serde::{Deserialize, Serialize};

use super::{
    query::{SearchFilters, SortBy},
    repo_types::{CategoryId, PetitionId, PetitionSummary},
};
use crate::{
    error::{AppError, AppResult},
    params::lenient_int,
    tiers::dto::NewTier,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePetitionRequest {
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
    pub support_tiers: Vec<NewTier>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchPetitionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPetitionResponse {
    pub petition_id: PetitionId,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub petitions: Vec<PetitionSummary>,
    pub count: usize,
}

/// `GET /petitions` query string, read from raw pairs so `categoryIds` can
/// repeat.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub filters: SearchFilters,
    pub start_index: Option<usize>,
    pub count: Option<usize>,
}

fn window_bound(raw: Option<&str>, name: &str) -> AppResult<Option<usize>> {
    match lenient_int(raw) {
        None => Ok(None),
        Some(n) if n < 0 => Err(AppError::bad_request(format!("{name} must not be negative"))),
        Some(n) => Ok(Some(n as usize)),
    }
}

fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

impl SearchParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> AppResult<Self> {
        let last = |key: &str| last_value(pairs, key);

        let category_ids = pairs
            .iter()
            .filter(|(k, _)| k == "categoryIds" || k == "categoryIds[]")
            .flat_map(|(_, v)| v.split(','))
            .filter_map(|v| lenient_int(Some(v)))
            .collect();

        let sort_by = match last("sortBy") {
            Some(s) => s.parse::<SortBy>()?,
            None => SortBy::default(),
        };

        Ok(Self {
            filters: SearchFilters {
                q: last("q").map(str::to_string),
                category_ids,
                supporting_cost: lenient_int(last("supportingCost")),
                owner_id: lenient_int(last("ownerId")),
                supporter_id: lenient_int(last("supporterId")),
                sort_by,
            },
            start_index: window_bound(last("startIndex"), "startIndex")?,
            count: window_bound(last("count"), "count")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_query_is_default_search() {
        let p = SearchParams::from_pairs(&[]).unwrap();
        assert_eq!(p, SearchParams::default());
        assert_eq!(p.filters.sort_by, SortBy::CreatedAsc);
    }

    #[test]
    fn repeated_category_ids_accumulate() {
        let p = SearchParams::from_pairs(&pairs(&[
            ("categoryIds", "1"),
            ("categoryIds", "3,4"),
            ("categoryIds", "x"),
        ]))
        .unwrap();
        assert_eq!(p.filters.category_ids, vec![1, 3, 4]);
    }

    #[test]
    fn invalid_numbers_are_not_supplied() {
        let p = SearchParams::from_pairs(&pairs(&[
            ("ownerId", "abc"),
            ("supporterId", ""),
            ("supportingCost", "ten"),
            ("startIndex", "first"),
            ("count", "lots"),
        ]))
        .unwrap();
        assert_eq!(p.filters.owner_id, None);
        assert_eq!(p.filters.supporter_id, None);
        assert_eq!(p.filters.supporting_cost, None);
        assert_eq!(p.start_index, None);
        assert_eq!(p.count, None);
        assert!(p.filters.clauses().is_empty());
    }

    #[test]
    fn numbers_and_sort_are_read() {
        let p = SearchParams::from_pairs(&pairs(&[
            ("q", "kiwi"),
            ("supportingCost", "7"),
            ("ownerId", "2"),
            ("sortBy", "COST_DESC"),
            ("startIndex", "5"),
            ("count", "10"),
        ]))
        .unwrap();
        assert_eq!(p.filters.q.as_deref(), Some("kiwi"));
        assert_eq!(p.filters.supporting_cost, Some(7));
        assert_eq!(p.filters.owner_id, Some(2));
        assert_eq!(p.filters.sort_by, SortBy::CostDesc);
        assert_eq!(p.start_index, Some(5));
        assert_eq!(p.count, Some(10));
    }

    #[test]
    fn unknown_sort_and_negative_window_are_bad_requests() {
        assert!(matches!(
            SearchParams::from_pairs(&pairs(&[("sortBy", "RANDOM")])),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            SearchParams::from_pairs(&pairs(&[("startIndex", "-1")])),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            SearchParams::from_pairs(&pairs(&[("count", "-5")])),
            Err(AppError::BadRequest(_))
        ));
    }
}
