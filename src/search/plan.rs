//! Budget-aware selection of the archives worth fetching.
//!
//! The planner walks the ordered candidates once. Every candidate contributes
//! to the total match count, but only candidates reached while the running
//! total is still within the download budget are selected for retrieval. The
//! candidate that crosses the budget is selected too, since its leading rows
//! are still needed.
//!
//! The budget is always the download limit. Previews fetch the same archives a
//! download would and are truncated later, during accumulation.

use crate::models::CandidateRecord;

use super::filter::Category;

/// Request-scoped retrieval decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalPlan {
    /// Candidates to fetch, in retrieval order.
    pub selected: Vec<CandidateRecord>,
    /// Rows matching the category across every candidate, fetched or not.
    pub total_matching_rows: u64,
    /// Index of the candidate whose rows pushed the total over budget.
    pub budget_exceeded_at: Option<usize>,
}

impl RetrievalPlan {
    /// True when no archive needs to be fetched.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether the full match set fits the budget it was planned with.
    pub fn within_budget(&self) -> bool {
        self.budget_exceeded_at.is_none()
    }
}

/// Select the candidates to fetch under `download_budget` rows.
pub fn plan(
    candidates: impl IntoIterator<Item = CandidateRecord>,
    category: Category,
    download_budget: u64,
) -> RetrievalPlan {
    let mut out = RetrievalPlan::default();

    for (idx, candidate) in candidates.into_iter().enumerate() {
        let matching = candidate.matching_rows(category);
        if out.budget_exceeded_at.is_none() {
            out.selected.push(candidate);
        }
        out.total_matching_rows += matching;
        if out.budget_exceeded_at.is_none() && out.total_matching_rows > download_budget {
            out.budget_exceeded_at = Some(idx);
        }
    }

    out
}
