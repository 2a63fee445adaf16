//! Keyword search over a static documentation index.
//!
//! The index is a JSON array of `{id, title, body, category, url}` loaded
//! once at startup. Scoring per query term: title contains it +10, category
//! contains it +5, body contains it +1, title equals it +20.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Results returned when the caller gives no usable `limit`.
pub const DEFAULT_LIMIT: usize = 10;

/// Upper bound on `limit`.
pub const MAX_LIMIT: usize = 50;

const EXCERPT_LEN: usize = 200;
const EXCERPT_BEFORE: usize = 50;
const EXCERPT_AFTER: usize = 150;

/// One indexed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocEntry {
    /// Index-local id.
    pub id: u64,
    /// Page title.
    pub title: String,
    /// Plain-text body.
    pub body: String,
    /// Section name.
    pub category: String,
    /// Link to the page.
    pub url: String,
}

/// A scored hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocHit {
    /// Page title.
    pub title: String,
    /// Section name.
    pub category: String,
    /// Link to the page.
    pub url: String,
    /// Body window around the first matching term.
    pub excerpt: String,
    /// Relevance score, higher first.
    pub score: u32,
}

/// The loaded index.
#[derive(Debug, Clone, Default)]
pub struct DocsIndex {
    entries: Vec<DocEntry>,
}

impl DocsIndex {
    /// Wraps already-parsed entries.
    #[must_use]
    pub const fn new(entries: Vec<DocEntry>) -> Self {
        Self { entries }
    }

    /// Reads the index at `path`. A missing or malformed file yields an
    /// empty index.
    pub fn load(path: &Path) -> Self {
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<Vec<DocEntry>>(&raw).map_err(|e| e.to_string()));
        match parsed {
            Ok(entries) => {
                tracing::info!(path = %path.display(), entries = entries.len(), "loaded docs index");
                Self::new(entries)
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to load docs index, using empty index");
                Self::default()
            }
        }
    }

    /// Number of indexed pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The best `limit` hits for `query`, highest score first.
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> Vec<DocHit> {
        let lowered = query.to_lowercase();
        let terms: Vec<&str> = lowered.split_whitespace().collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<DocHit> = self
            .entries
            .iter()
            .map(|entry| score(entry, &terms))
            .filter(|hit| hit.score > 0)
            .collect();
        // stable: equal scores keep index order
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}

fn score(entry: &DocEntry, terms: &[&str]) -> DocHit {
    let title = entry.title.to_lowercase();
    let body = entry.body.to_lowercase();
    let category = entry.category.to_lowercase();

    let score = terms
        .iter()
        .map(|term| {
            let mut s = 0;
            if title.contains(term) {
                s += 10;
            }
            if category.contains(term) {
                s += 5;
            }
            if body.contains(term) {
                s += 1;
            }
            if title == *term {
                s += 20;
            }
            s
        })
        .sum();

    DocHit {
        title: entry.title.clone(),
        category: entry.category.clone(),
        url: entry.url.clone(),
        excerpt: excerpt(&entry.body, terms),
        score,
    }
}

/// Character offset and length in `chars` of the first case-insensitive
/// match of `term`, which must already be lowercase.
fn find_folded(chars: &[char], term: &str) -> Option<(usize, usize)> {
    let wanted = term.chars().count();
    (0..chars.len()).find_map(|start| {
        let mut folded = String::new();
        let mut folded_len = 0;
        let mut used = 0;
        while folded_len < wanted && start + used < chars.len() {
            for c in chars[start + used].to_lowercase() {
                folded.push(c);
                folded_len += 1;
            }
            used += 1;
        }
        folded.starts_with(term).then_some((start, used))
    })
}

/// Window of `body` around the first term found past its first character,
/// else its first 200 characters.
fn excerpt(body: &str, terms: &[&str]) -> String {
    let chars: Vec<char> = body.chars().collect();
    let hit = terms
        .iter()
        .find_map(|term| find_folded(&chars, term).filter(|&(idx, _)| idx > 0));

    let Some((idx, term_len)) = hit else {
        return chars.iter().take(EXCERPT_LEN).collect();
    };
    let start = idx.saturating_sub(EXCERPT_BEFORE);
    let end = (idx + term_len + EXCERPT_AFTER).min(chars.len());
    let start = start.min(end);

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.extend(&chars[start..end]);
    if end < chars.len() {
        out.push_str("...");
    }
    out
}

/// `min(limit, 50)`, defaulting to 10 when absent or unparsable.
#[must_use]
pub fn clamp_limit(raw: Option<&str>) -> usize {
    raw.and_then(|l| l.trim().parse::<usize>().ok())
        .map_or(DEFAULT_LIMIT, |l| l.min(MAX_LIMIT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, title: &str, category: &str, body: &str) -> DocEntry {
        DocEntry {
            id,
            title: title.to_owned(),
            body: body.to_owned(),
            category: category.to_owned(),
            url: format!("/docs/{id}"),
        }
    }

    fn index() -> DocsIndex {
        DocsIndex::new(vec![
            entry(1, "Receipts", "Proofs", "Every paid response is anchored in receipts."),
            entry(2, "Rate limits", "API", "Free endpoints allow 60 requests per minute."),
            entry(3, "Pricing", "API", "Receipts cost nothing extra."),
        ])
    }

    #[test]
    fn test_scoring_and_order() {
        let hits = index().search("Receipts", 10);
        assert_eq!(hits.len(), 2);
        // title contains +10, body contains +1, exact title +20
        assert_eq!(hits[0].title, "Receipts");
        assert_eq!(hits[0].score, 31);
        // body contains only
        assert_eq!(hits[1].title, "Pricing");
        assert_eq!(hits[1].score, 1);
    }

    #[test]
    fn test_category_and_multi_term() {
        let hits = index().search("api minute", 10);
        assert_eq!(hits[0].title, "Rate limits");
        assert_eq!(hits[0].score, 5 + 1);
        assert_eq!(hits[1].title, "Pricing");
        assert_eq!(hits[1].score, 5);
    }

    #[test]
    fn test_blank_query_and_limit() {
        assert!(index().search("   ", 10).is_empty());
        assert_eq!(index().search("receipts", 1).len(), 1);
    }

    #[test]
    fn test_excerpt_windows() {
        let body = format!("{}needle{}", "a".repeat(100), "b".repeat(300));
        let out = excerpt(&body, &["needle"]);
        assert!(out.starts_with("..."));
        assert!(out.ends_with("..."));
        assert_eq!(out.len(), 3 + 50 + 6 + 150 + 3);

        // a match at index 0 does not move the window
        let out = excerpt("Needle then text", &["needle"]);
        assert_eq!(out, "Needle then text");

        let long = "x".repeat(250);
        assert_eq!(excerpt(&long, &["zzz"]).len(), 200);
    }

    #[test]
    fn test_excerpt_offsets_follow_original_text() {
        // 'İ' lowercases to two chars, which must not shift the window
        let body = format!("{}NEEDLE{}", "İ".repeat(60), "b".repeat(300));
        let out = excerpt(&body, &["needle"]);
        assert_eq!(out, format!("...{}NEEDLE{}...", "İ".repeat(50), "b".repeat(150)));
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 10);
        assert_eq!(clamp_limit(Some("5")), 5);
        assert_eq!(clamp_limit(Some("500")), 50);
        assert_eq!(clamp_limit(Some("abc")), 10);
    }
}
