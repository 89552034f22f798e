//! Candidate ordering.
//!
//! Candidates are interleaved by period rather than grouped by agency: when a
//! caller asks for many agencies, a small preview budget then still surfaces
//! rows from several of them.

use crate::models::CandidateRecord;

/// Stable sort by `(year, month)` ascending; ties keep index order.
pub fn order_candidates(candidates: &mut [CandidateRecord]) {
    candidates.sort_by_key(|c| (c.year, c.month));
}
