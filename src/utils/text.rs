//! Text normalization shared by the deduplicator, ranker and expander.
//!
//! Identifier normalization follows the registrars' rules: DOIs are
//! case-insensitive, arXiv IDs drop their version suffix, titles are
//! compared after stripping punctuation and leading articles.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Closed list of common English words excluded from keyword extraction
/// and query-match scoring.
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "are", "was", "been", "being", "have",
    "has", "had", "not", "but", "what", "all", "were", "when", "there", "can", "will", "may",
    "would", "could", "should", "into", "than", "then", "them", "these", "those", "their",
];

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Lower-case a DOI and strip resolver and scheme prefixes.
pub fn normalize_doi(doi: &str) -> String {
    let mut result = doi.trim().to_lowercase();
    for prefix in ["https://doi.org/", "http://doi.org/", "doi:"] {
        if let Some(stripped) = result.strip_prefix(prefix) {
            result = stripped.to_string();
        }
    }
    result
}

/// Lower-case an arXiv ID, strip the `arxiv:` prefix and any `vN` suffix.
pub fn normalize_arxiv_id(arxiv_id: &str) -> String {
    let mut result = arxiv_id.trim().to_lowercase();
    if let Some(stripped) = result.strip_prefix("arxiv:") {
        result = stripped.to_string();
    }
    // Trailing version suffix: "2301.00001v2" -> "2301.00001"
    if let Some(pos) = result.rfind('v') {
        if pos > 0 && result[pos + 1..].chars().all(|c| c.is_ascii_digit())
            && !result[pos + 1..].is_empty()
        {
            result.truncate(pos);
        }
    }
    result
}

/// Normalize a title for duplicate comparison: lower-case, punctuation
/// stripped, whitespace collapsed, leading article removed.
pub fn normalize_title(title: &str) -> String {
    let lowered: String = title
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    let mut result = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    for article in ["a ", "an ", "the "] {
        if let Some(stripped) = result.strip_prefix(article) {
            result = stripped.to_string();
            break;
        }
    }
    result
}

/// Lower-cased alphanumeric word tokens longer than `min_len` characters.
pub fn tokenize(text: &str, min_len: usize) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| word.len() > min_len)
        .collect()
}

/// Jaccard similarity of two token sets.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Lower-cased surname of an author name (last whitespace-separated word,
/// letters only).
pub fn author_surname(author: &str) -> String {
    author
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_string()
}

/// Strip XML/JATS markup from abstracts returned by registry APIs.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn doi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"10\.\d{4,9}/[-._;()/:a-zA-Z0-9]+").expect("valid DOI regex"))
}

/// Extract the first DOI-looking token from free text or a URL.
pub fn extract_doi(text: &str) -> Option<String> {
    doi_regex()
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ';', ')']).to_string())
}

/// Extract the first plausible publication year (1900..=2099) from text.
pub fn extract_year(text: &str) -> Option<i32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid year regex"));
    re.find(text).and_then(|m| m.as_str().parse().ok())
}
