//! Similarity scoring for evidence deduplication
//!
//! The composite score blends four signals:
//!
//! | Signal   | Weight | Measure                                          |
//! |----------|--------|--------------------------------------------------|
//! | text     | 0.6    | 0.4 Jaccard + 0.4 cosine + 0.2 Levenshtein       |
//! | type     | 0.2    | exact `evidence_type` equality                   |
//! | control  | 0.1    | exact `control_id` equality                      |
//! | location | 0.1    | mean of the location sub-signals both sides carry|
//!
//! Weighted sums are taken over integer weights and divided by ten, so a
//! record compared with a copy of itself scores exactly 1.0 and no score
//! rises above it.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use strsim::levenshtein;

use crate::normalization::{normalize_text, tokenize};
use crate::record::{EvidenceRecord, SourceLocation};

/// Per-signal view of a composite similarity score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityBreakdown {
    /// Text similarity (0.0 to 1.0)
    pub text: f64,
    /// 1.0 when evidence types match, else 0.0
    pub evidence_type: f64,
    /// 1.0 when control ids match, else 0.0
    pub control: f64,
    /// Location similarity (0.0 to 1.0)
    pub location: f64,
    /// Overall similarity score (0.0 to 1.0)
    pub score: f64,
}

impl SimilarityBreakdown {
    /// Human-readable explanation of the score
    pub fn reason(&self) -> String {
        let mut reasons = vec![format!("Text: {:.0}%", self.text * 100.0)];
        if self.evidence_type > 0.0 {
            reasons.push("Same evidence type".to_string());
        }
        if self.control > 0.0 {
            reasons.push("Same control".to_string());
        }
        reasons.push(format!("Location: {:.0}%", self.location * 100.0));
        reasons.join("; ")
    }
}

/// A record with its comparison text normalized once up front
#[derive(Debug, Clone)]
pub(crate) struct PreparedRecord<'a> {
    pub record: &'a EvidenceRecord,
    pub text: String,
    section_title: Option<String>,
}

impl<'a> PreparedRecord<'a> {
    pub fn new(record: &'a EvidenceRecord) -> Self {
        let section_title = record
            .source_location
            .as_ref()
            .and_then(|loc| loc.section_title.as_deref())
            .map(normalize_text);

        Self {
            record,
            text: normalize_text(&record.evidence_text),
            section_title,
        }
    }
}

/// Normalize every record of a batch, keeping input order
pub(crate) fn prepare_all(records: &[EvidenceRecord]) -> Vec<PreparedRecord<'_>> {
    records.iter().map(PreparedRecord::new).collect()
}

/// Composite similarity between two evidence records (0.0 to 1.0)
///
/// Symmetric, and 1.0 for a record compared with an identical copy.
pub fn calculate_similarity(a: &EvidenceRecord, b: &EvidenceRecord) -> f64 {
    explain_similarity(a, b).score
}

/// Composite similarity with each signal broken out
pub fn explain_similarity(a: &EvidenceRecord, b: &EvidenceRecord) -> SimilarityBreakdown {
    breakdown_prepared(&PreparedRecord::new(a), &PreparedRecord::new(b))
}

pub(crate) fn score_prepared(a: &PreparedRecord<'_>, b: &PreparedRecord<'_>) -> f64 {
    breakdown_prepared(a, b).score
}

fn breakdown_prepared(a: &PreparedRecord<'_>, b: &PreparedRecord<'_>) -> SimilarityBreakdown {
    let text = normalized_text_similarity(&a.text, &b.text);
    let evidence_type = indicator(a.record.evidence_type == b.record.evidence_type);
    let control = indicator(a.record.control_id == b.record.control_id);
    let location = prepared_location_similarity(a, b);

    let score = (6.0 * text + 2.0 * evidence_type + control + location) / 10.0;

    SimilarityBreakdown {
        text,
        evidence_type,
        control,
        location,
        score,
    }
}

fn indicator(equal: bool) -> f64 {
    if equal {
        1.0
    } else {
        0.0
    }
}

/// Text similarity between two raw strings (normalized before comparing)
pub fn text_similarity(a: &str, b: &str) -> f64 {
    normalized_text_similarity(&normalize_text(a), &normalize_text(b))
}

/// Weighted blend of Jaccard, cosine, and Levenshtein on normalized text
///
/// Identical normalized texts, empty ones included, score 1.0 outright.
fn normalized_text_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let jaccard = jaccard_similarity(a, b);
    let cosine = cosine_similarity(a, b);
    let edit = levenshtein_similarity(a, b);

    (4.0 * jaccard + 4.0 * cosine + 2.0 * edit) / 10.0
}

/// Jaccard similarity over whitespace tokens of normalized text
///
/// Two empty token sets are identical and score 1.0; one empty set scores 0.0.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<&str> = tokenize(a).collect();
    let tokens_b: HashSet<&str> = tokenize(b).collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();

    intersection as f64 / union as f64
}

/// Cosine similarity of term-frequency vectors over normalized text
///
/// 0.0 when either text has no tokens.
pub fn cosine_similarity(a: &str, b: &str) -> f64 {
    let freq_a = term_frequencies(a);
    let freq_b = term_frequencies(b);

    if freq_a.is_empty() || freq_b.is_empty() {
        return 0.0;
    }

    // Integer sums: exact and independent of map iteration order
    let dot: u128 = freq_a
        .iter()
        .filter_map(|(term, &count_a)| freq_b.get(term).map(|&count_b| count_a * count_b))
        .sum();
    let magnitude_a: u128 = freq_a.values().map(|c| c * c).sum();
    let magnitude_b: u128 = freq_b.values().map(|c| c * c).sum();

    let denominator = ((magnitude_a * magnitude_b) as f64).sqrt();
    (dot as f64 / denominator).min(1.0)
}

fn term_frequencies(text: &str) -> HashMap<&str, u128> {
    let mut frequencies = HashMap::new();
    for token in tokenize(text) {
        *frequencies.entry(token).or_insert(0) += 1;
    }
    frequencies
}

/// Edit-distance similarity: `1 - distance / max(len_a, len_b)`
///
/// Lengths are in characters. Two empty strings score 1.0.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Similarity of two optional source locations
///
/// Averages the sub-signals present on both sides: chunk type equality,
/// section title text similarity, and page proximity
/// (`max(0, 1 - |page_a - page_b| / 10)`).
///
/// - neither record has a location: 1.0
/// - only one has a location: 0.0
/// - both have one but share no sub-signal: 1.0 if equal, else 0.0
pub fn location_similarity(a: Option<&SourceLocation>, b: Option<&SourceLocation>) -> f64 {
    let title_a = a
        .and_then(|loc| loc.section_title.as_deref())
        .map(normalize_text);
    let title_b = b
        .and_then(|loc| loc.section_title.as_deref())
        .map(normalize_text);

    location_signals(a, b, title_a.as_deref(), title_b.as_deref())
}

fn prepared_location_similarity(a: &PreparedRecord<'_>, b: &PreparedRecord<'_>) -> f64 {
    location_signals(
        a.record.source_location.as_ref(),
        b.record.source_location.as_ref(),
        a.section_title.as_deref(),
        b.section_title.as_deref(),
    )
}

fn location_signals(
    a: Option<&SourceLocation>,
    b: Option<&SourceLocation>,
    title_a: Option<&str>,
    title_b: Option<&str>,
) -> f64 {
    let (loc_a, loc_b) = match (a, b) {
        (None, None) => return 1.0,
        (Some(loc_a), Some(loc_b)) => (loc_a, loc_b),
        _ => return 0.0,
    };

    let mut signals: Vec<f64> = Vec::with_capacity(3);

    if let (Some(type_a), Some(type_b)) = (&loc_a.chunk_type, &loc_b.chunk_type) {
        signals.push(indicator(type_a == type_b));
    }

    if let (Some(title_a), Some(title_b)) = (title_a, title_b) {
        signals.push(normalized_text_similarity(title_a, title_b));
    }

    if let (Some(page_a), Some(page_b)) = (loc_a.page_number, loc_b.page_number) {
        signals.push(page_proximity(page_a, page_b));
    }

    if signals.is_empty() {
        return indicator(loc_a == loc_b);
    }

    signals.iter().sum::<f64>() / signals.len() as f64
}

fn page_proximity(page_a: i64, page_b: i64) -> f64 {
    let distance = page_a.abs_diff(page_b) as f64;
    (1.0 - distance / 10.0).max(0.0)
}
