use std::cmp::Ordering;

use crate::candidate::{Candidate, ScoredCandidate};
use crate::score::Scorer;

pub const DEFAULT_AUTO_SCORE_THRESHOLD: f64 = 0.80;
pub const DEFAULT_GAP_THRESHOLD: f64 = 0.12;

/// Terminal state of the decision for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Blank query: nothing was looked up.
    Empty,
    /// The catalog returned nothing.
    NoMatch,
    /// Top candidate taken without asking. `score` is `None` when there was a
    /// single candidate and scoring was skipped.
    Auto {
        chosen: Candidate,
        score: Option<f64>,
    },
    /// Similarity was inconclusive; a human must pick from `ranked`
    /// (descending score, ties in source order).
    Escalate { ranked: Vec<ScoredCandidate> },
}

/// Auto-accept vs. escalate rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    pub auto_score_threshold: f64,
    pub gap_threshold: f64,
    pub no_confirm: bool,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            auto_score_threshold: DEFAULT_AUTO_SCORE_THRESHOLD,
            gap_threshold: DEFAULT_GAP_THRESHOLD,
            no_confirm: false,
        }
    }
}

impl DecisionPolicy {
    pub fn decide(
        &self,
        query: Option<&str>,
        candidates: Vec<Candidate>,
        scorer: &dyn Scorer,
    ) -> Decision {
        let query = match query.map(str::trim) {
            Some(q) if !q.is_empty() => q,
            _ => return Decision::Empty,
        };
        match candidates.len() {
            0 => Decision::NoMatch,
            1 => Decision::Auto {
                chosen: candidates.into_iter().next().unwrap_or_default(),
                score: None,
            },
            _ => self.decide_scored(rank(query, candidates, scorer)),
        }
    }

    /// Applies the thresholds to candidates that already carry a score.
    pub fn decide_scored(&self, mut scored: Vec<ScoredCandidate>) -> Decision {
        if scored.is_empty() {
            return Decision::NoMatch;
        }
        sort_by_score(&mut scored);
        let top = scored[0].score;
        let second = scored.get(1).map(|s| s.score).unwrap_or(0.0);
        if scored.len() == 1
            || self.no_confirm
            || top >= self.auto_score_threshold
            || (top - second) >= self.gap_threshold
        {
            let best = scored.swap_remove(0);
            return Decision::Auto {
                chosen: best.candidate,
                score: Some(best.score),
            };
        }
        Decision::Escalate { ranked: scored }
    }
}

/// Scores every candidate against the query and sorts them best first.
pub fn rank(query: &str, candidates: Vec<Candidate>, scorer: &dyn Scorer) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|c| {
            let score = scorer.score(query, &c.exact_title);
            ScoredCandidate::new(c, score)
        })
        .collect();
    sort_by_score(&mut scored);
    scored
}

// Stable: equal scores keep source order.
fn sort_by_score(scored: &mut [ScoredCandidate]) {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::BuiltinScorer;

    fn titled(title: &str) -> Candidate {
        Candidate {
            exact_title: title.to_string(),
            ..Candidate::default()
        }
    }

    fn scored(pairs: &[(&str, f64)]) -> Vec<ScoredCandidate> {
        pairs
            .iter()
            .map(|(t, s)| ScoredCandidate::new(titled(t), *s))
            .collect()
    }

    #[test]
    fn blank_query_is_empty() {
        let policy = DecisionPolicy::default();
        assert_eq!(policy.decide(None, vec![titled("x")], &BuiltinScorer), Decision::Empty);
        assert_eq!(policy.decide(Some("  "), vec![], &BuiltinScorer), Decision::Empty);
    }

    #[test]
    fn no_candidates_is_no_match() {
        let policy = DecisionPolicy::default();
        assert_eq!(policy.decide(Some("dune"), vec![], &BuiltinScorer), Decision::NoMatch);
    }

    #[test]
    fn single_candidate_is_auto_regardless_of_score() {
        let policy = DecisionPolicy::default();
        let decision = policy.decide(Some("dune"), vec![titled("Zzz Unrelated")], &BuiltinScorer);
        assert_eq!(
            decision,
            Decision::Auto {
                chosen: titled("Zzz Unrelated"),
                score: None
            }
        );
    }

    #[test]
    fn top_meeting_threshold_exactly_is_auto() {
        let policy = DecisionPolicy::default();
        match policy.decide_scored(scored(&[("b", 0.50), ("a", 0.80)])) {
            Decision::Auto { chosen, score } => {
                assert_eq!(chosen.exact_title, "a");
                assert_eq!(score, Some(0.80));
            }
            other => panic!("expected auto, got {other:?}"),
        }
    }

    #[test]
    fn gap_meeting_threshold_exactly_is_auto() {
        let policy = DecisionPolicy::default();
        let decision = policy.decide_scored(scored(&[("a", 0.70), ("b", 0.58)]));
        assert!(matches!(decision, Decision::Auto { .. }));
    }

    #[test]
    fn small_gap_below_threshold_escalates() {
        let policy = DecisionPolicy::default();
        match policy.decide_scored(scored(&[("b", 0.60), ("a", 0.70)])) {
            Decision::Escalate { ranked } => {
                let titles: Vec<_> = ranked.iter().map(|s| s.candidate.exact_title.as_str()).collect();
                assert_eq!(titles, ["a", "b"]);
            }
            other => panic!("expected escalation, got {other:?}"),
        }
    }

    #[test]
    fn no_confirm_never_escalates() {
        let policy = DecisionPolicy {
            no_confirm: true,
            ..DecisionPolicy::default()
        };
        let decision = policy.decide_scored(scored(&[("a", 0.30), ("b", 0.29)]));
        assert!(matches!(decision, Decision::Auto { chosen, .. } if chosen.exact_title == "a"));
    }

    #[test]
    fn ties_keep_source_order() {
        let policy = DecisionPolicy {
            no_confirm: true,
            ..DecisionPolicy::default()
        };
        let decision = policy.decide_scored(scored(&[("first", 0.5), ("second", 0.5), ("third", 0.5)]));
        assert!(matches!(decision, Decision::Auto { chosen, .. } if chosen.exact_title == "first"));

        let strict = DecisionPolicy::default();
        match strict.decide_scored(scored(&[("x", 0.1), ("first", 0.5), ("second", 0.5)])) {
            Decision::Escalate { ranked } => {
                assert_eq!(ranked[0].candidate.exact_title, "first");
                assert_eq!(ranked[1].candidate.exact_title, "second");
                assert_eq!(ranked[2].candidate.exact_title, "x");
            }
            other => panic!("expected escalation, got {other:?}"),
        }
    }

    #[test]
    fn decide_is_deterministic() {
        let policy = DecisionPolicy::default();
        let candidates = vec![titled("Dune Messiah"), titled("Dune"), titled("Children of Dune")];
        let first = policy.decide(Some("dune"), candidates.clone(), &BuiltinScorer);
        for _ in 0..5 {
            assert_eq!(policy.decide(Some("dune"), candidates.clone(), &BuiltinScorer), first);
        }
    }

    #[test]
    fn exact_title_wins_against_sequels() {
        let policy = DecisionPolicy::default();
        let candidates = vec![titled("Dune Messiah"), titled("Dune")];
        match policy.decide(Some("Dune"), candidates, &BuiltinScorer) {
            Decision::Auto { chosen, score } => {
                assert_eq!(chosen.exact_title, "Dune");
                assert_eq!(score, Some(1.0));
            }
            other => panic!("expected auto, got {other:?}"),
        }
    }
}
