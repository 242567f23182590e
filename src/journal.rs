use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::normalize::normalize_cell;
use crate::resolve::{Outcome, State};

#[derive(Debug, Serialize)]
struct JournalEntry<'a> {
    row: usize,
    query: &'a str,
    normalized: String,
    state: State,
    top_score: Option<f64>,
    candidates: usize,
    chosen_title: &'a str,
    chosen_link: &'a str,
    ts: String,
}

/// Append-only JSONL record of every decision, flushed per row.
pub struct Journal {
    file: File,
}

impl Journal {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Open journal {:?}", path))?;
        Ok(Self { file })
    }

    pub fn record(&mut self, row: usize, query: Option<&str>, outcome: &Outcome) -> Result<()> {
        let entry = JournalEntry {
            row,
            query: query.unwrap_or(""),
            normalized: normalize_cell(query),
            state: outcome.state,
            top_score: outcome.top_score,
            candidates: outcome.candidates,
            chosen_title: &outcome.resolution.exact_title,
            chosen_link: &outcome.resolution.source_url,
            ts: chrono::Utc::now().to_rfc3339(),
        };
        writeln!(self.file, "{}", serde_json::to_string(&entry)?)?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;

    #[test]
    fn one_json_object_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("decisions.jsonl");
        let mut journal = Journal::open(&path).unwrap();
        let outcome = Outcome {
            state: State::NoMatch,
            resolution: Candidate::empty(),
            top_score: None,
            candidates: 0,
        };
        journal.record(0, Some("Dune (Kindle Edition)"), &outcome).unwrap();
        journal.record(1, None, &outcome).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["normalized"], "dune");
        assert_eq!(lines[0]["state"], "no_match");
        assert!(lines[0]["top_score"].is_null());
        assert_eq!(lines[1]["row"], 1);
        assert_eq!(lines[1]["query"], "");
    }
}
