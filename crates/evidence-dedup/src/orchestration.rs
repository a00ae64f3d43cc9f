//! Deduplication pipeline and duplicate reporting
//!
//! `deduplicate` runs normalize -> group -> resolve -> reassemble. Output is the
//! resolved records in group discovery order, followed by every input record
//! no group claimed, in input order.
//!
//! `find_potential_duplicates` is the read-only audit view: every pair scoring
//! at or above a threshold, most similar first.

use std::collections::HashSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{validate_threshold, DeduplicationOptions, OverflowPolicy};
use crate::error::DedupResult;
use crate::grouping::{group_prepared, SimilarityGroup};
use crate::record::EvidenceRecord;
use crate::resolution::resolve_group;
use crate::similarity::{prepare_all, score_prepared, PreparedRecord};

/// What happened to a group during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupDisposition {
    /// Resolved into one output record
    Resolved,
    /// Past the cap; members returned unchanged
    PassedThrough,
    /// Past the cap; members left out of the output
    Dropped,
}

/// A group found during a run, by record id
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub representative_id: String,
    pub member_ids: Vec<String>,
    pub similarity_score: f64,
    pub disposition: GroupDisposition,
}

/// Counters for a deduplication run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeduplicationStats {
    pub input_records: usize,
    pub groups_found: usize,
    pub groups_resolved: usize,
    pub groups_overflowed: usize,
    pub records_passed_through: usize,
    pub records_dropped: usize,
    pub output_records: usize,
}

/// Full result of a deduplication run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeduplicationOutcome {
    pub records: Vec<EvidenceRecord>,
    pub groups: Vec<GroupSummary>,
    pub stats: DeduplicationStats,
}

/// A pair of records scoring at or above the reporting threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicatePair<'a> {
    pub a: &'a EvidenceRecord,
    pub b: &'a EvidenceRecord,
    pub similarity: f64,
}

/// Deduplicate a batch of evidence records
///
/// Never mutates the input. Fails only on invalid options, in which case no
/// records are returned.
pub fn deduplicate(
    records: &[EvidenceRecord],
    options: &DeduplicationOptions,
) -> DedupResult<Vec<EvidenceRecord>> {
    Ok(deduplicate_detailed(records, options)?.records)
}

/// Deduplicate a batch and report the groups and counters behind the result
pub fn deduplicate_detailed(
    records: &[EvidenceRecord],
    options: &DeduplicationOptions,
) -> DedupResult<DeduplicationOutcome> {
    options.validate()?;

    tracing::info!(
        records = records.len(),
        threshold = options.similarity_threshold,
        merge = options.merge_similar_items,
        max_groups = options.max_similarity_groups,
        "deduplicating evidence batch"
    );

    let prepared = prepare_all(records);
    let groups = group_prepared(
        &prepared,
        options.similarity_threshold,
        options.candidate_strategy,
    );

    let cap = options.max_similarity_groups.min(groups.len());
    let (kept, overflow) = groups.split_at(cap);

    if !overflow.is_empty() {
        tracing::warn!(
            found = groups.len(),
            cap = options.max_similarity_groups,
            policy = ?options.overflow_policy,
            "similarity groups exceed cap"
        );
    }

    let mut output: Vec<EvidenceRecord> = kept.iter().map(|g| resolve_group(g, options)).collect();

    let claimed_groups = match options.overflow_policy {
        OverflowPolicy::PassThrough => kept,
        OverflowPolicy::Drop => &groups[..],
    };
    let claimed: HashSet<&str> = claimed_groups
        .iter()
        .flat_map(|g| g.records().map(|r| r.id.as_str()))
        .collect();

    let before_pass_through = output.len();
    output.extend(
        records
            .iter()
            .filter(|r| !claimed.contains(r.id.as_str()))
            .cloned(),
    );
    let records_passed_through = output.len() - before_pass_through;

    let overflow_disposition = match options.overflow_policy {
        OverflowPolicy::PassThrough => GroupDisposition::PassedThrough,
        OverflowPolicy::Drop => GroupDisposition::Dropped,
    };
    let summaries: Vec<GroupSummary> = kept
        .iter()
        .map(|g| summarize(g, GroupDisposition::Resolved))
        .chain(overflow.iter().map(|g| summarize(g, overflow_disposition)))
        .collect();

    let records_dropped = match options.overflow_policy {
        OverflowPolicy::PassThrough => 0,
        OverflowPolicy::Drop => overflow.iter().map(SimilarityGroup::size).sum(),
    };

    let stats = DeduplicationStats {
        input_records: records.len(),
        groups_found: groups.len(),
        groups_resolved: kept.len(),
        groups_overflowed: overflow.len(),
        records_passed_through,
        records_dropped,
        output_records: output.len(),
    };

    tracing::info!(
        input = stats.input_records,
        groups = stats.groups_found,
        output = stats.output_records,
        "deduplication finished"
    );

    Ok(DeduplicationOutcome {
        records: output,
        groups: summaries,
        stats,
    })
}

fn summarize(group: &SimilarityGroup<'_>, disposition: GroupDisposition) -> GroupSummary {
    GroupSummary {
        representative_id: group.representative.id.clone(),
        member_ids: group.members.iter().map(|r| r.id.clone()).collect(),
        similarity_score: group.similarity_score,
        disposition,
    }
}

/// Every pair of records scoring at or above `threshold`, most similar first
///
/// Read-only and independent of any grouping options. Pairs with equal
/// scores keep input order.
pub fn find_potential_duplicates(
    records: &[EvidenceRecord],
    threshold: f64,
) -> DedupResult<Vec<DuplicatePair<'_>>> {
    validate_threshold(threshold)?;

    let prepared = prepare_all(records);
    let mut pairs = score_all_pairs(&prepared, threshold);
    pairs.sort_by(|x, y| y.similarity.total_cmp(&x.similarity));

    tracing::debug!(
        records = records.len(),
        pairs = pairs.len(),
        threshold,
        "potential duplicates found"
    );

    Ok(pairs)
}

#[cfg(feature = "parallel")]
fn score_all_pairs<'a>(prepared: &[PreparedRecord<'a>], threshold: f64) -> Vec<DuplicatePair<'a>> {
    let n = prepared.len();
    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| ((i + 1)..n).filter_map(move |j| pair_if_similar(prepared, i, j, threshold)))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn score_all_pairs<'a>(prepared: &[PreparedRecord<'a>], threshold: f64) -> Vec<DuplicatePair<'a>> {
    let n = prepared.len();
    (0..n)
        .flat_map(|i| ((i + 1)..n).filter_map(move |j| pair_if_similar(prepared, i, j, threshold)))
        .collect()
}

fn pair_if_similar<'a>(
    prepared: &[PreparedRecord<'a>],
    i: usize,
    j: usize,
    threshold: f64,
) -> Option<DuplicatePair<'a>> {
    let similarity = score_prepared(&prepared[i], &prepared[j]);
    (similarity >= threshold).then(|| DuplicatePair {
        a: prepared[i].record,
        b: prepared[j].record,
        similarity,
    })
}
