//! Greedy single-pass grouping of similar evidence records
//!
//! Records are swept left to right. Each record not yet claimed becomes an
//! anchor and pulls in every later unclaimed record scoring at or above the
//! threshold against it. Membership is decided against the anchor only, so the
//! result depends on input order and is not a transitive closure.
//!
//! Claimed state is tracked by position in the batch, never by record identity.

use std::collections::{BTreeSet, HashMap};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::CandidateStrategy;
use crate::normalization::tokenize;
use crate::record::EvidenceRecord;
use crate::similarity::{prepare_all, score_prepared, PreparedRecord};

/// A cluster of near-duplicate records found during the sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityGroup<'a> {
    /// The anchor record that opened the group
    pub representative: &'a EvidenceRecord,
    /// Records that matched the anchor, in input order
    pub members: Vec<&'a EvidenceRecord>,
    /// Highest anchor-to-member score observed
    pub similarity_score: f64,
}

impl<'a> SimilarityGroup<'a> {
    /// Representative followed by members, in group order
    pub fn records(&self) -> impl Iterator<Item = &'a EvidenceRecord> + '_ {
        std::iter::once(self.representative).chain(self.members.iter().copied())
    }

    /// Ids of every record in the group
    pub fn ids(&self) -> Vec<&'a str> {
        self.records().map(|r| r.id.as_str()).collect()
    }

    /// Number of records in the group, representative included
    pub fn size(&self) -> usize {
        self.members.len() + 1
    }
}

/// Group a batch by exhaustive pairwise comparison
pub fn find_similarity_groups(
    records: &[EvidenceRecord],
    threshold: f64,
) -> Vec<SimilarityGroup<'_>> {
    find_similarity_groups_with(records, threshold, CandidateStrategy::Exhaustive)
}

/// Group a batch, choosing which pairs get scored
pub fn find_similarity_groups_with(
    records: &[EvidenceRecord],
    threshold: f64,
    strategy: CandidateStrategy,
) -> Vec<SimilarityGroup<'_>> {
    let prepared = prepare_all(records);
    group_prepared(&prepared, threshold, strategy)
}

pub(crate) fn group_prepared<'a>(
    prepared: &[PreparedRecord<'a>],
    threshold: f64,
    strategy: CandidateStrategy,
) -> Vec<SimilarityGroup<'a>> {
    let candidates = CandidateIndex::build(prepared, strategy);
    let mut groups: Vec<SimilarityGroup<'a>> = Vec::new();
    let mut processed = vec![false; prepared.len()];

    for i in 0..prepared.len() {
        if processed[i] {
            continue;
        }

        let open: Vec<usize> = candidates
            .later_candidates(i)
            .into_iter()
            .filter(|&j| !processed[j])
            .collect();
        let scores = score_against(prepared, i, &open);

        let mut members = Vec::new();
        let mut max_score: f64 = 0.0;

        for (&j, &score) in open.iter().zip(scores.iter()) {
            tracing::trace!(
                anchor = %prepared[i].record.id,
                candidate = %prepared[j].record.id,
                score,
                "scored pair"
            );
            if score >= threshold {
                members.push(prepared[j].record);
                processed[j] = true;
                if score > max_score {
                    max_score = score;
                }
            }
        }

        if !members.is_empty() {
            groups.push(SimilarityGroup {
                representative: prepared[i].record,
                members,
                similarity_score: max_score,
            });
        }

        processed[i] = true;
    }

    tracing::debug!(
        records = prepared.len(),
        groups = groups.len(),
        threshold,
        "grouping sweep finished"
    );

    groups
}

/// Score the anchor against a fixed list of candidates, preserving order
fn score_against(prepared: &[PreparedRecord<'_>], anchor: usize, candidates: &[usize]) -> Vec<f64> {
    #[cfg(feature = "parallel")]
    let scores: Vec<f64> = candidates
        .par_iter()
        .map(|&j| score_prepared(&prepared[anchor], &prepared[j]))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let scores: Vec<f64> = candidates
        .iter()
        .map(|&j| score_prepared(&prepared[anchor], &prepared[j]))
        .collect();

    scores
}

/// Decides which later records an anchor is compared against
pub(crate) enum CandidateIndex {
    Exhaustive { len: usize },
    SharedToken {
        postings: HashMap<String, Vec<usize>>,
        tokens: Vec<Vec<String>>,
    },
}

impl CandidateIndex {
    pub fn build(prepared: &[PreparedRecord<'_>], strategy: CandidateStrategy) -> Self {
        match strategy {
            CandidateStrategy::Exhaustive => CandidateIndex::Exhaustive {
                len: prepared.len(),
            },
            CandidateStrategy::SharedToken => {
                let mut postings: HashMap<String, Vec<usize>> = HashMap::new();
                let mut tokens = Vec::with_capacity(prepared.len());

                for (idx, record) in prepared.iter().enumerate() {
                    let unique: BTreeSet<&str> = tokenize(&record.text).collect();
                    for token in &unique {
                        postings.entry(token.to_string()).or_default().push(idx);
                    }
                    tokens.push(unique.into_iter().map(str::to_string).collect());
                }

                CandidateIndex::SharedToken { postings, tokens }
            }
        }
    }

    /// Candidate positions after `i`, ascending
    pub fn later_candidates(&self, i: usize) -> Vec<usize> {
        match self {
            CandidateIndex::Exhaustive { len } => ((i + 1)..*len).collect(),
            CandidateIndex::SharedToken { postings, tokens } => {
                let mut later = BTreeSet::new();
                for token in &tokens[i] {
                    if let Some(positions) = postings.get(token) {
                        later.extend(positions.iter().copied().filter(|&j| j > i));
                    }
                }
                later.into_iter().collect()
            }
        }
    }
}
