//! Petition search.
//!
//! The statement starts from an unconditional base that selects one row per
//! petition. Every supplied filter becomes a [`Clause`] that appends one
//! `AND` predicate; tier and supporter filters are `EXISTS` subqueries, so no
//! filter can multiply a petition's rows.

use std::str::FromStr;

use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::repo_types::PetitionSummary;
use crate::error::AppError;

const MIN_COST: &str =
    "(SELECT COALESCE(MIN(st.cost), 0) FROM support_tier st WHERE st.petition_id = p.id)";

const BASE: &str = r#"SELECT p.id AS petition_id,
       p.title,
       p.category_id,
       p.owner_id,
       u.first_name AS owner_first_name,
       u.last_name AS owner_last_name,
       (SELECT COUNT(*) FROM supporter s WHERE s.petition_id = p.id) AS number_of_supporters,
       p.creation_date,
       "#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    AlphabeticalAsc,
    AlphabeticalDesc,
    CostAsc,
    CostDesc,
    #[default]
    CreatedAsc,
    CreatedDesc,
}

impl FromStr for SortBy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ALPHABETICAL_ASC" => SortBy::AlphabeticalAsc,
            "ALPHABETICAL_DESC" => SortBy::AlphabeticalDesc,
            "COST_ASC" => SortBy::CostAsc,
            "COST_DESC" => SortBy::CostDesc,
            "CREATED_ASC" => SortBy::CreatedAsc,
            "CREATED_DESC" => SortBy::CreatedDesc,
            other => return Err(AppError::bad_request(format!("unknown sortBy {other}"))),
        })
    }
}

impl SortBy {
    /// Sort key, always followed by ascending petition id as tie-break.
    fn key(self) -> String {
        match self {
            SortBy::AlphabeticalAsc => "p.title ASC".into(),
            SortBy::AlphabeticalDesc => "p.title DESC".into(),
            SortBy::CostAsc => format!("{MIN_COST} ASC"),
            SortBy::CostDesc => format!("{MIN_COST} DESC"),
            SortBy::CreatedAsc => "p.creation_date ASC".into(),
            SortBy::CreatedDesc => "p.creation_date DESC".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub q: Option<String>,
    pub category_ids: Vec<i64>,
    pub supporting_cost: Option<i64>,
    pub owner_id: Option<i64>,
    pub supporter_id: Option<i64>,
    pub sort_by: SortBy,
}

/// One optional predicate of the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Case-insensitive substring of title or description.
    Text(String),
    CategoryIn(Vec<i64>),
    /// Some tier costs between 0 and the ceiling inclusive.
    CostAtMost(i64),
    Owner(i64),
    /// The user has at least one support event on the petition.
    SupportedBy(i64),
}

impl Clause {
    pub fn push(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Clause::Text(q) => {
                qb.push(" AND (strpos(lower(p.title), lower(")
                    .push_bind(q.clone())
                    .push(")) > 0 OR strpos(lower(p.description), lower(")
                    .push_bind(q.clone())
                    .push(")) > 0)");
            }
            Clause::CategoryIn(ids) => {
                qb.push(" AND p.category_id = ANY(")
                    .push_bind(ids.clone())
                    .push(")");
            }
            Clause::CostAtMost(ceiling) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM support_tier st \
                     WHERE st.petition_id = p.id AND st.cost BETWEEN 0 AND ",
                )
                .push_bind(*ceiling)
                .push(")");
            }
            Clause::Owner(id) => {
                qb.push(" AND p.owner_id = ").push_bind(*id);
            }
            Clause::SupportedBy(id) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM supporter s \
                     WHERE s.petition_id = p.id AND s.user_id = ",
                )
                .push_bind(*id)
                .push(")");
            }
        }
    }
}

impl SearchFilters {
    /// The clauses these filters switch on, in a fixed order.
    pub fn clauses(&self) -> Vec<Clause> {
        // blank q is pass-through; otherwise the text is matched as given
        let text = self
            .q
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .map(|q| Clause::Text(q.to_string()));
        let categories =
            (!self.category_ids.is_empty()).then(|| Clause::CategoryIn(self.category_ids.clone()));

        [
            text,
            categories,
            self.supporting_cost.map(Clause::CostAtMost),
            self.owner_id.map(Clause::Owner),
            self.supporter_id.map(Clause::SupportedBy),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn build(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::<Postgres>::new(BASE);
        qb.push(MIN_COST).push(
            " AS supporting_cost\n  FROM petition p\n  JOIN users u ON u.id = p.owner_id\n WHERE TRUE",
        );
        let mut qb = self.clauses().iter().fold(qb, |mut qb, clause| {
            clause.push(&mut qb);
            qb
        });
        qb.push(" ORDER BY ")
            .push(self.sort_by.key())
            .push(", p.id ASC");
        qb
    }
}

pub async fn search(db: &PgPool, filters: &SearchFilters) -> anyhow::Result<Vec<PetitionSummary>> {
    let mut qb = filters.build();
    let rows = qb
        .build_query_as::<PetitionSummary>()
        .fetch_all(db)
        .await
        .context("search petitions")?;
    Ok(rows)
}
