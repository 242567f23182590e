use log::debug;
use serde::Serialize;

use crate::candidate::Candidate;
use crate::decide::{Decision, DecisionPolicy};
use crate::fetch::{CandidateFetcher, SearchTransport};
use crate::manual::{ManualResolver, Selection};
use crate::score::Scorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Empty,
    NoMatch,
    Auto,
    Escalated,
}

/// What happened to one input title.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub state: State,
    /// Chosen record, or the blank candidate.
    pub resolution: Candidate,
    pub top_score: Option<f64>,
    pub candidates: usize,
}

impl Outcome {
    fn blank(state: State, candidates: usize) -> Self {
        Self {
            state,
            resolution: Candidate::empty(),
            top_score: None,
            candidates,
        }
    }
}

/// Runs the full lookup for one title at a time:
/// fetch, score, decide, and ask a human when needed.
pub struct TitleResolver<T> {
    fetcher: CandidateFetcher<T>,
    scorer: Box<dyn Scorer>,
    policy: DecisionPolicy,
    manual: Box<dyn ManualResolver>,
}

impl<T: SearchTransport> TitleResolver<T> {
    pub fn new(
        fetcher: CandidateFetcher<T>,
        scorer: Box<dyn Scorer>,
        policy: DecisionPolicy,
        manual: Box<dyn ManualResolver>,
    ) -> Self {
        Self {
            fetcher,
            scorer,
            policy,
            manual,
        }
    }

    pub async fn resolve(&mut self, raw_title: Option<&str>) -> Outcome {
        let query = match raw_title.map(str::trim) {
            Some(q) if !q.is_empty() => q,
            _ => return Outcome::blank(State::Empty, 0),
        };
        let candidates = self.fetcher.fetch(query).await;
        let found = candidates.len();
        match self.policy.decide(Some(query), candidates, self.scorer.as_ref()) {
            Decision::Empty => Outcome::blank(State::Empty, found),
            Decision::NoMatch => Outcome::blank(State::NoMatch, found),
            Decision::Auto { chosen, score } => {
                debug!("{query:?}: auto-selected {:?} (score {score:?})", chosen.exact_title);
                Outcome {
                    state: State::Auto,
                    resolution: chosen,
                    top_score: score,
                    candidates: found,
                }
            }
            Decision::Escalate { ranked } => {
                let top_score = ranked.first().map(|s| s.score);
                let selection = self.manual.resolve(query, &ranked);
                debug!("{query:?}: manual selection {selection:?}");
                let resolution = match selection {
                    Selection::Chosen(i) => ranked
                        .into_iter()
                        .nth(i)
                        .map(|s| s.candidate)
                        .unwrap_or_default(),
                    Selection::Skip | Selection::Cancel => Candidate::empty(),
                };
                Outcome {
                    state: State::Escalated,
                    resolution,
                    top_score,
                    candidates: found,
                }
            }
        }
    }
}

/// Per-state tallies for the end-of-run report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub empty: usize,
    pub no_match: usize,
    pub auto: usize,
    pub escalated: usize,
    pub manual_chosen: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome.state {
            State::Empty => self.empty += 1,
            State::NoMatch => self.no_match += 1,
            State::Auto => self.auto += 1,
            State::Escalated => {
                self.escalated += 1;
                if !outcome.resolution.is_empty() {
                    self.manual_chosen += 1;
                }
            }
        }
    }

    pub fn total(&self) -> usize {
        self.empty + self.no_match + self.auto + self.escalated
    }
}
