use std::collections::HashSet;

use clap::ValueEnum;

use crate::normalize::normalize_title;

/// Similarity between a query and a candidate title, in `[0, 1]`.
pub trait Scorer {
    fn name(&self) -> &'static str;

    /// Compares two already-normalized strings.
    fn similarity(&self, query: &str, title: &str) -> f64;

    /// Normalizes both sides, then compares them.
    fn score(&self, query: &str, title: &str) -> f64 {
        clamp(self.similarity(&normalize_title(query), &normalize_title(title)))
    }
}

/// Optional capabilities compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub fuzzy: bool,
}

impl Capabilities {
    pub fn detect() -> Self {
        Self {
            fuzzy: cfg!(feature = "fuzzy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScorerChoice {
    /// Token-set ratio when available, otherwise the built-in scorer
    #[default]
    Auto,
    /// Always use the built-in Jaccard + sequence-ratio scorer
    Builtin,
}

/// Picks the scorer once, at startup, from the capabilities at hand.
pub fn scorer_for(caps: Capabilities, choice: ScorerChoice) -> Box<dyn Scorer> {
    if choice == ScorerChoice::Auto && caps.fuzzy {
        if let Some(scorer) = token_set_scorer() {
            return scorer;
        }
        log::warn!("fuzzy capability requested but not compiled in; using built-in scorer");
    }
    Box::new(BuiltinScorer)
}

#[cfg(feature = "fuzzy")]
fn token_set_scorer() -> Option<Box<dyn Scorer>> {
    Some(Box::new(TokenSetScorer))
}

#[cfg(not(feature = "fuzzy"))]
fn token_set_scorer() -> Option<Box<dyn Scorer>> {
    None
}

/// `0.6 * token Jaccard + 0.4 * LCS sequence ratio`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinScorer;

impl Scorer for BuiltinScorer {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn similarity(&self, query: &str, title: &str) -> f64 {
        0.6 * token_jaccard(query, title) + 0.4 * sequence_ratio(query, title)
    }
}

/// Token-set ratio: compares the shared word set against each side's
/// leftovers, so order, duplicates and extra words matter little. Pairs are
/// compared with [`sequence_ratio`].
#[cfg(feature = "fuzzy")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSetScorer;

#[cfg(feature = "fuzzy")]
impl Scorer for TokenSetScorer {
    fn name(&self) -> &'static str {
        "token-set"
    }

    fn similarity(&self, query: &str, title: &str) -> f64 {
        token_set_ratio(query, title)
    }
}

#[cfg(feature = "fuzzy")]
fn token_set_ratio(a: &str, b: &str) -> f64 {
    use std::collections::BTreeSet;

    let a_set: BTreeSet<&str> = a.split_whitespace().collect();
    let b_set: BTreeSet<&str> = b.split_whitespace().collect();
    if a_set.is_empty() || b_set.is_empty() {
        return 0.0;
    }
    let sect = a_set.intersection(&b_set).copied().collect::<Vec<_>>().join(" ");
    let only_a = a_set.difference(&b_set).copied().collect::<Vec<_>>().join(" ");
    let only_b = b_set.difference(&a_set).copied().collect::<Vec<_>>().join(" ");
    let with_a = join_words(&sect, &only_a);
    let with_b = join_words(&sect, &only_b);
    // indel ratio; an empty intersection never counts as a match
    let ratio = |x: &str, y: &str| {
        if x.is_empty() || y.is_empty() {
            0.0
        } else {
            sequence_ratio(x, y)
        }
    };
    ratio(&sect, &with_a)
        .max(ratio(&sect, &with_b))
        .max(ratio(&with_a, &with_b))
}

#[cfg(feature = "fuzzy")]
fn join_words(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

/// |A ∩ B| / |A ∪ B| over whitespace-separated words; 0 when both are empty.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let a_tokens: HashSet<_> = a.split_whitespace().collect();
    let b_tokens: HashSet<_> = b.split_whitespace().collect();
    let union = a_tokens.union(&b_tokens).count() as f64;
    if union == 0.0 {
        return 0.0;
    }
    let inter = a_tokens.intersection(&b_tokens).count() as f64;
    inter / union
}

/// `2 * LCS / (len(a) + len(b))` over characters; 1 when both are empty.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let lcs = lcs_length(&a, &b);
    (2.0 * lcs as f64) / (a.len() as f64 + b.len() as f64)
}

fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ch_a in a {
        for (j, &ch_b) in b.iter().enumerate() {
            curr[j + 1] = if ch_a == ch_b {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn clamp(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
