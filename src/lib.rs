//! Enrich a CSV of book titles with Goodreads metadata.
//!
//! Each title is normalized, looked up, scored against the results, and
//! either auto-matched or handed to a human for disambiguation.

pub mod candidate;
pub mod decide;
pub mod error;
pub mod fetch;
pub mod goodreads;
pub mod interrupt;
pub mod journal;
pub mod manual;
pub mod normalize;
pub mod resolve;
pub mod score;
pub mod table;

pub use candidate::{Candidate, ScoredCandidate};
pub use decide::{Decision, DecisionPolicy};
pub use error::ConfigError;
pub use fetch::{CandidateFetcher, FetchError, HttpTransport, RetryPolicy, SearchTransport};
pub use interrupt::Interrupt;
pub use manual::{ManualResolver, Selection};
pub use normalize::normalize_title;
pub use resolve::{Outcome, RunSummary, State, TitleResolver};
pub use score::{scorer_for, Capabilities, Scorer, ScorerChoice};
