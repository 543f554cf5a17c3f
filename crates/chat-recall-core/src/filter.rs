//! Relevance filtering of retrieved candidates.
//!
//! The threshold is a tunable policy, not a semantic boundary. The default
//! is permissive so small or sparse indexes still yield some context.

use crate::models::CandidateMatch;

/// Default similarity threshold on a `[0, 1]` cosine score.
pub const DEFAULT_THRESHOLD: f64 = 0.15;

/// Keep candidates with `score > threshold`, preserving input order.
pub fn filter_relevant(candidates: Vec<CandidateMatch>, threshold: f64) -> Vec<CandidateMatch> {
    candidates
        .into_iter()
        .filter(|c| c.score > threshold)
        .collect()
}
