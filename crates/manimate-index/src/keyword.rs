//! Lexical fallback ranking over the curated examples.

use crate::examples::Example;

pub const DEFAULT_MAX_RESULTS: usize = 2;

const NAME_WEIGHT: u32 = 10;
const TAG_WEIGHT: u32 = 5;
const NOTES_WEIGHT: u32 = 2;
const VOCABULARY_WEIGHT: u32 = 3;
const MIN_TERM_LEN: usize = 3;

/// Domain words that earn a bonus when they appear in both the query and the name.
pub const VOCABULARY: [&str; 16] = [
    "plot",
    "graph",
    "axes",
    "function",
    "transform",
    "animate",
    "circle",
    "square",
    "vector",
    "arrow",
    "text",
    "label",
    "riemann",
    "integral",
    "derivative",
    "tangent",
];

#[derive(Debug, Clone, Copy)]
pub struct KeywordScorer {
    max_results: usize,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESULTS)
    }
}

/// Function words that never count as query terms on their own.
const STOP_WORDS: [&str; 40] = [
    "the", "and", "for", "what", "with", "that", "this", "from", "into", "are", "was", "were",
    "has", "have", "had", "you", "your", "can", "how", "not", "but", "all", "any", "its", "our",
    "out", "about", "then", "than", "them", "they", "there", "their", "which", "when", "where",
    "who", "why", "will", "would",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Lowercased alphanumeric words of `text`.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Equal up to a trailing plural `s`.
fn same_word(a: &str, b: &str) -> bool {
    a == b || a.strip_suffix('s') == Some(b) || b.strip_suffix('s') == Some(a)
}

fn has_word(haystack: &[String], word: &str) -> bool {
    haystack.iter().any(|w| same_word(w, word))
}

/// `needle` occurs in `haystack` as a run of whole words.
fn contains_phrase(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && haystack
            .windows(needle.len())
            .any(|run| run.iter().zip(needle).all(|(a, b)| same_word(a, b)))
}

struct Query {
    whole: Vec<String>,
    terms: Vec<String>,
}

impl Query {
    /// `None` when the query holds nothing but function words.
    fn parse(raw: &str) -> Option<Self> {
        let whole = words(raw);
        if whole.iter().all(|w| is_stop_word(w)) {
            return None;
        }
        let terms = whole
            .iter()
            .filter(|t| t.chars().count() >= MIN_TERM_LEN && !is_stop_word(t))
            .cloned()
            .collect();
        Some(Self { whole, terms })
    }

    /// `haystack` holds the whole query as a phrase, or any term as a word.
    fn found_in(&self, haystack: &[String]) -> bool {
        contains_phrase(haystack, &self.whole) || self.terms.iter().any(|t| has_word(haystack, t))
    }
}

impl KeywordScorer {
    #[must_use]
    pub fn new(max_results: usize) -> Self {
        Self { max_results }
    }

    #[must_use]
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Relevance of `example` to `query`. Zero means no match.
    #[must_use]
    pub fn score(&self, example: &Example, query: &str) -> u32 {
        Query::parse(query).map_or(0, |q| score_parsed(example, &q))
    }

    /// Examples with a positive score, best first, ties in library order, at most
    /// `max_results`.
    #[must_use]
    pub fn search<'a>(&self, examples: &'a [Example], query: &str) -> Vec<&'a Example> {
        let Some(q) = Query::parse(query) else {
            return Vec::new();
        };
        let mut scored: Vec<(u32, &Example)> = examples
            .iter()
            .map(|e| (score_parsed(e, &q), e))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(self.max_results);
        tracing::debug!(query, hits = scored.len(), "keyword fallback search");
        scored.into_iter().map(|(_, e)| e).collect()
    }
}

fn score_parsed(example: &Example, q: &Query) -> u32 {
    let name = words(&example.name);
    let mut score = 0;

    if q.found_in(&name) {
        score += NAME_WEIGHT;
    }

    for tag in &example.tags {
        let tag = words(tag);
        if tag.is_empty() {
            continue;
        }
        if contains_phrase(&q.whole, &tag) || q.found_in(&tag) {
            score += TAG_WEIGHT;
        }
    }

    if q.found_in(&words(&example.notes)) {
        score += NOTES_WEIGHT;
    }

    for word in VOCABULARY {
        if has_word(&q.whole, word) && has_word(&name, word) {
            score += VOCABULARY_WEIGHT;
        }
    }

    score
}
