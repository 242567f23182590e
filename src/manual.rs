//! Human disambiguation when the scores cannot decide.

use std::io::{self, BufRead, Write};

use indicatif::ProgressBar;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::candidate::ScoredCandidate;

/// Candidates shown per page.
pub const PAGE_SIZE: usize = 3;

/// Answer to one disambiguation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into the ranked list that was offered.
    Chosen(usize),
    Skip,
    Cancel,
}

/// Blocks until a single candidate (or none) is picked for `query`.
///
/// `ranked` is ordered best first. Implementations return at most one
/// selection per call.
pub trait ManualResolver {
    fn resolve(&mut self, query: &str, ranked: &[ScoredCandidate]) -> Selection;
}

impl<M: ManualResolver + ?Sized> ManualResolver for Box<M> {
    fn resolve(&mut self, query: &str, ranked: &[ScoredCandidate]) -> Selection {
        (**self).resolve(query, ranked)
    }
}

/// Declines every request; used when nobody is at the keyboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysSkip;

impl ManualResolver for AlwaysSkip {
    fn resolve(&mut self, _query: &str, _ranked: &[ScoredCandidate]) -> Selection {
        Selection::Skip
    }
}

/// Hides a progress bar while the wrapped resolver has the terminal.
pub struct Suspended<M> {
    inner: M,
    pb: ProgressBar,
}

impl<M> Suspended<M> {
    pub fn new(inner: M, pb: ProgressBar) -> Self {
        Self { inner, pb }
    }
}

impl<M: ManualResolver> ManualResolver for Suspended<M> {
    fn resolve(&mut self, query: &str, ranked: &[ScoredCandidate]) -> Selection {
        let Self { inner, pb } = self;
        off_runtime(|| pb.suspend(|| inner.resolve(query, ranked)))
    }
}

// The prompt blocks on stdin; keep the async workers free meanwhile.
fn off_runtime<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Line-oriented prompt paging through candidates [`PAGE_SIZE`] at a time.
///
/// Commands: `1`..`3` pick from the current page, `n`/`p` move between
/// pages, `s` skips, `q` cancels. End of input counts as cancel.
pub struct TerminalResolver<R, W> {
    input: R,
    output: W,
}

impl TerminalResolver<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalResolver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn show_page(&mut self, query: &str, ranked: &[ScoredCandidate], page: usize) -> io::Result<()> {
        let pages = ranked.len().div_ceil(PAGE_SIZE);
        writeln!(self.output)?;
        writeln!(
            self.output,
            "Which book is {query:?}? (page {}/{pages})",
            page + 1
        )?;
        let start = page * PAGE_SIZE;
        for (slot, scored) in ranked[start..].iter().take(PAGE_SIZE).enumerate() {
            let c = &scored.candidate;
            let year = if c.publish_date.is_empty() { "?" } else { c.publish_date.as_str() };
            writeln!(
                self.output,
                "  [{}] {} by {} ({year}), {} ratings, score {:.2}",
                slot + 1,
                c.exact_title,
                if c.author.is_empty() { "unknown author" } else { c.author.as_str() },
                c.ratings_count,
                scored.score
            )?;
            if !c.image_url.is_empty() {
                writeln!(self.output, "      cover: {}", c.image_url)?;
            }
        }
        write!(self.output, "Pick 1-3, n(ext), p(revious), s(kip), q(uit): ")?;
        self.output.flush()
    }

    fn prompt(&mut self, query: &str, ranked: &[ScoredCandidate]) -> io::Result<Selection> {
        if ranked.is_empty() {
            return Ok(Selection::Skip);
        }
        let last_page = (ranked.len() - 1) / PAGE_SIZE;
        let mut page = 0;
        let mut line = String::new();
        loop {
            self.show_page(query, ranked, page)?;
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(Selection::Cancel);
            }
            match line.trim().to_lowercase().as_str() {
                "n" => page = (page + 1).min(last_page),
                "p" => page = page.saturating_sub(1),
                "s" => return Ok(Selection::Skip),
                "q" => return Ok(Selection::Cancel),
                other => {
                    let on_page = (ranked.len() - page * PAGE_SIZE).min(PAGE_SIZE);
                    match other.parse::<usize>() {
                        Ok(n) if (1..=on_page).contains(&n) => {
                            return Ok(Selection::Chosen(page * PAGE_SIZE + n - 1));
                        }
                        _ => writeln!(self.output, "Unrecognized choice {other:?}")?,
                    }
                }
            }
        }
    }
}

impl<R: BufRead, W: Write> ManualResolver for TerminalResolver<R, W> {
    fn resolve(&mut self, query: &str, ranked: &[ScoredCandidate]) -> Selection {
        match self.prompt(query, ranked) {
            Ok(selection) => selection,
            Err(e) => {
                log::warn!("manual resolution aborted: {e}");
                Selection::Cancel
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use std::io::Cursor;

    fn ranked(n: usize) -> Vec<ScoredCandidate> {
        (0..n)
            .map(|i| {
                ScoredCandidate::new(
                    Candidate {
                        exact_title: format!("Book {i}"),
                        author: "Author".into(),
                        ..Candidate::default()
                    },
                    1.0 - i as f64 / 10.0,
                )
            })
            .collect()
    }

    fn answer(script: &str, n: usize) -> (Selection, String) {
        let mut out = Vec::new();
        let selection = TerminalResolver::new(Cursor::new(script.to_string()), &mut out)
            .resolve("some book", &ranked(n));
        (selection, String::from_utf8(out).unwrap())
    }

    #[test]
    fn picks_from_first_page() {
        let (sel, out) = answer("2\n", 5);
        assert_eq!(sel, Selection::Chosen(1));
        assert!(out.contains("[1] Book 0"));
        assert!(out.contains("[3] Book 2"));
        assert!(!out.contains("Book 3"));
        assert!(out.contains("page 1/2"));
    }

    #[test]
    fn pages_forward_and_back() {
        let (sel, out) = answer("n\n2\n", 5);
        assert_eq!(sel, Selection::Chosen(4));
        assert!(out.contains("[1] Book 3"));

        let (sel, _) = answer("n\nn\np\n1\n", 5);
        assert_eq!(sel, Selection::Chosen(0));
    }

    #[test]
    fn out_of_page_choice_is_rejected() {
        // second page holds only two entries
        let (sel, out) = answer("n\n3\n1\n", 5);
        assert_eq!(sel, Selection::Chosen(3));
        assert!(out.contains("Unrecognized choice \"3\""));
    }

    #[test]
    fn skip_cancel_and_eof() {
        assert_eq!(answer("s\n", 2).0, Selection::Skip);
        assert_eq!(answer("Q\n", 2).0, Selection::Cancel);
        assert_eq!(answer("", 2).0, Selection::Cancel);
        assert_eq!(answer("zzz\n", 2).0, Selection::Cancel);
    }

    #[test]
    fn suspended_passes_the_answer_through() {
        let pb = indicatif::ProgressBar::hidden();
        let mut wrapped = Suspended::new(
            TerminalResolver::new(Cursor::new("3\n".to_string()), Vec::new()),
            pb,
        );
        assert_eq!(wrapped.resolve("some book", &ranked(4)), Selection::Chosen(2));
    }

    #[test]
    fn always_skip_declines() {
        assert_eq!(AlwaysSkip.resolve("q", &ranked(3)), Selection::Skip);
    }
}
