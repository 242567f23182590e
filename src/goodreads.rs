//! Goodreads search page → [`Candidate`] records.
//!
//! Every field is extracted independently; a missing piece leaves that field
//! blank (or zero) instead of dropping the candidate.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::candidate::Candidate;
use crate::fetch::FetchError;

pub const BASE_URL: &str = "https://www.goodreads.com";

static BOOK_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"tr[itemtype="http://schema.org/Book"]"#).unwrap());
static BOOK_BOX: Lazy<Selector> = Lazy::new(|| Selector::parse("div.bookBox").unwrap());
static TABLE_LIST: Lazy<Selector> = Lazy::new(|| Selector::parse("table.tableList").unwrap());
static TABLE_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());

static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.bookTitle").unwrap());
static BOOK_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/book/show/"]"#).unwrap());
static AUTHOR_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.authorName").unwrap());
static AUTHOR_HREF: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/author/show/"]"#).unwrap());
static META_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.greyText.smallText").unwrap());
static MINI_RATING: Lazy<Selector> = Lazy::new(|| Selector::parse("span.minirating").unwrap());
static COVER: Lazy<Selector> = Lazy::new(|| Selector::parse("img.bookCover").unwrap());
static ANY_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());
static RATINGS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d[\d,]*)\s+ratings?\b").unwrap());

/// Parses at most `max_results` result entries, in page order.
///
/// Returns [`FetchError::Parse`] when none of the known result layouts is
/// present in the page.
pub fn parse_search_results(html: &str, max_results: usize) -> Result<Vec<Candidate>, FetchError> {
    let doc = Html::parse_document(html);
    let rows = result_rows(&doc);
    if rows.is_empty() {
        return Err(FetchError::Parse("no search result rows".into()));
    }
    Ok(rows
        .into_iter()
        .take(max_results)
        .map(candidate_from_row)
        .collect())
}

fn result_rows(doc: &Html) -> Vec<ElementRef<'_>> {
    let rows: Vec<_> = doc.select(&BOOK_ROW).collect();
    if !rows.is_empty() {
        return rows;
    }
    let rows: Vec<_> = doc.select(&BOOK_BOX).collect();
    if !rows.is_empty() {
        return rows;
    }
    match doc.select(&TABLE_LIST).next() {
        // first row is the header
        Some(table) => table.select(&TABLE_ROW).skip(1).collect(),
        None => Vec::new(),
    }
}

fn candidate_from_row(row: ElementRef<'_>) -> Candidate {
    let title_el = first_match(row, &[&*TITLE_LINK, &*BOOK_LINK]);
    let author_el = first_match(row, &[&*AUTHOR_LINK, &*AUTHOR_HREF]);
    let meta = row.select(&META_BLOCK).next().map(element_text).unwrap_or_default();
    let ratings_count = ratings_count(&meta).or_else(|| {
        row.select(&MINI_RATING)
            .next()
            .and_then(|el| ratings_count(&element_text(el)))
    });
    Candidate {
        exact_title: title_el.map(element_text).unwrap_or_default(),
        author: author_el.map(element_text).unwrap_or_default(),
        publish_date: publish_year(&meta).unwrap_or_default(),
        ratings_count: ratings_count.unwrap_or(0),
        source_url: title_el
            .and_then(|el| el.value().attr("href"))
            .map(absolute_url)
            .unwrap_or_default(),
        image_url: first_match(row, &[&*COVER, &*ANY_IMG])
            .and_then(|el| el.value().attr("src"))
            .map(absolute_url)
            .unwrap_or_default(),
    }
}

fn first_match<'a>(row: ElementRef<'a>, selectors: &[&Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| row.select(sel).next())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn absolute_url(href: &str) -> String {
    Url::parse(BASE_URL)
        .and_then(|base| base.join(href.trim()))
        .map(String::from)
        .unwrap_or_default()
}

/// Digits (with thousands separators) followed by "rating(s)".
pub fn ratings_count(text: &str) -> Option<u64> {
    let caps = RATINGS_RE.captures(text)?;
    caps[1].replace(',', "").parse().ok()
}

/// First 19xx/20xx token once rating counts are taken out of the text.
pub fn publish_year(text: &str) -> Option<String> {
    let without_counts = RATINGS_RE.replace_all(text, " ");
    YEAR_RE
        .find(&without_counts)
        .map(|m| m.as_str().to_string())
}
