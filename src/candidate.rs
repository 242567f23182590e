use serde::Serialize;

/// One catalog search result mapped to the fields the enricher writes out.
///
/// Built once by the fetcher and never mutated afterwards. The all-blank
/// value (see [`Candidate::empty`]) stands for "no match" or "skipped".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub exact_title: String,
    pub author: String,
    /// Four-digit year or empty.
    pub publish_date: String,
    pub ratings_count: u64,
    pub source_url: String,
    pub image_url: String,
}

impl Candidate {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A candidate together with its similarity to the query, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

impl ScoredCandidate {
    pub fn new(candidate: Candidate, score: f64) -> Self {
        Self { candidate, score }
    }
}
