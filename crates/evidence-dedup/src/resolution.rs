//! Resolution of similarity groups into single records
//!
//! Two policies:
//! - selection keeps the best-ranked record of the group as-is
//! - merge synthesizes one record from the whole group and lists every
//!   contributing record in `source_location.merged_from`

use std::collections::HashSet;

use crate::config::DeduplicationOptions;
use crate::grouping::SimilarityGroup;
use crate::record::{EvidenceRecord, MergeProvenance};

/// Separator placed between distinct texts of a merged record
pub const MERGE_SEPARATOR: &str = "\n\n---\n\n";

/// Score substituted for a missing quality or relevance value when averaging
const MISSING_SCORE_FOR_MERGE: f64 = 0.5;

/// Turn a group into its single output record
pub fn resolve_group(group: &SimilarityGroup<'_>, options: &DeduplicationOptions) -> EvidenceRecord {
    if options.merge_similar_items {
        merge_group(group)
    } else {
        select_best(group, options.preserve_highest_quality).clone()
    }
}

/// Pick the highest-ranked record of a group
///
/// Ranks by quality when `preserve_highest_quality` is set, otherwise by
/// relevance. Missing scores rank as 0.0; ties keep the earlier record.
pub fn select_best<'a>(
    group: &SimilarityGroup<'a>,
    preserve_highest_quality: bool,
) -> &'a EvidenceRecord {
    if preserve_highest_quality {
        best_by(group, |r| r.quality_score)
    } else {
        best_by(group, |r| r.relevance_score)
    }
}

fn best_by<'a>(
    group: &SimilarityGroup<'a>,
    score: impl Fn(&EvidenceRecord) -> Option<f64>,
) -> &'a EvidenceRecord {
    let mut best = group.representative;
    let mut best_score = score(best).unwrap_or(0.0);

    for candidate in group.members.iter().copied() {
        let candidate_score = score(candidate).unwrap_or(0.0);
        if candidate_score > best_score {
            best = candidate;
            best_score = candidate_score;
        }
    }

    best
}

/// Merge a group into one synthesized record
///
/// The highest-quality record supplies id, document, control, type, and
/// location. Distinct texts are joined in group order, scores are averaged
/// with 0.5 standing in for missing values, and the location records the
/// provenance of every contributing record.
pub fn merge_group(group: &SimilarityGroup<'_>) -> EvidenceRecord {
    let base = best_by(group, |r| r.quality_score);

    let mut seen: HashSet<&str> = HashSet::new();
    let texts: Vec<&str> = group
        .records()
        .map(|r| r.evidence_text.as_str())
        .filter(|text| seen.insert(*text))
        .collect();

    let quality = mean_with_default(group, |r| r.quality_score);
    let relevance = mean_with_default(group, |r| r.relevance_score);

    let mut location = base.source_location.clone().unwrap_or_default();
    location.merged_from = collect_provenance(group);

    tracing::debug!(
        base = %base.id,
        records = group.size(),
        distinct_texts = texts.len(),
        "merged similarity group"
    );

    EvidenceRecord {
        id: base.id.clone(),
        document_id: base.document_id.clone(),
        control_id: base.control_id.clone(),
        evidence_text: texts.join(MERGE_SEPARATOR),
        evidence_type: base.evidence_type.clone(),
        quality_score: Some(quality),
        relevance_score: Some(relevance),
        source_location: Some(location),
    }
}

fn mean_with_default(
    group: &SimilarityGroup<'_>,
    score: impl Fn(&EvidenceRecord) -> Option<f64>,
) -> f64 {
    let total: f64 = group
        .records()
        .map(|r| score(r).unwrap_or(MISSING_SCORE_FOR_MERGE))
        .sum();
    total / group.size() as f64
}

/// Provenance of every record in the group
///
/// A record that is itself a merge contributes its own provenance list, so
/// merging merged records still points back at the originals.
fn collect_provenance(group: &SimilarityGroup<'_>) -> Vec<MergeProvenance> {
    let mut provenance = Vec::new();
    for record in group.records() {
        match &record.source_location {
            Some(loc) if !loc.merged_from.is_empty() => {
                provenance.extend(loc.merged_from.iter().cloned())
            }
            _ => provenance.push(MergeProvenance::from(record)),
        }
    }
    provenance
}
