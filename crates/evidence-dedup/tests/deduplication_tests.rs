//! Deduplication integration tests
//!
//! Scenario tests for the pipeline and reporter, plus property-based checks
//! on the scorer and normalizer.

use evidence_dedup::{
    calculate_similarity, deduplicate, deduplicate_detailed, find_potential_duplicates,
    find_similarity_groups, normalize_text, DeduplicationOptions, EvidenceRecord,
    GroupDisposition, OverflowPolicy, SourceLocation, MERGE_SEPARATOR,
};
use proptest::prelude::*;
use rstest::rstest;

const EPS: f64 = 1e-9;

fn evidence(id: &str, control: &str, text: &str, kind: &str) -> EvidenceRecord {
    EvidenceRecord::new(id, format!("doc-{}", id), control, text, kind)
}

fn ids(records: &[EvidenceRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

// === Normalizer ===

#[rstest]
#[case("Access Control Policy", "access control policy")]
#[case("  MFA:   required!  ", "mfa required")]
#[case("SOC 2 Type II (2024)", "soc 2 type ii 2024")]
#[case("line\none\ttab", "line one tab")]
#[case("...", "")]
#[case("", "")]
fn test_normalize_cases(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(normalize_text(input), expected);
}

// === Scorer scenarios ===

#[test]
fn test_identical_records_without_location_score_one() {
    let a = evidence("a", "AC-2", "User access is reviewed every quarter", "policy");
    let b = evidence("b", "AC-2", "User access is reviewed every quarter", "policy");
    assert_eq!(calculate_similarity(&a, &b), 1.0);
}

#[test]
fn test_identical_records_are_grouped_and_selected_once() {
    let a = evidence("a", "AC-2", "User access is reviewed every quarter", "policy");
    let b = evidence("b", "AC-2", "User access is reviewed every quarter", "policy");
    let records = vec![a, b];

    let groups = find_similarity_groups(&records, 0.8);
    assert_eq!(groups.len(), 1);

    let output = deduplicate(&records, &DeduplicationOptions::default()).unwrap();
    assert_eq!(output.len(), 1);
}

#[rstest]
#[case(None, None)]
#[case(
    Some(SourceLocation::new().with_chunk_type("table").with_page(1)),
    Some(SourceLocation::new().with_chunk_type("paragraph").with_page(90))
)]
#[case(Some(SourceLocation::new().with_page(4)), None)]
fn test_disjoint_records_stay_separate(
    #[case] loc_a: Option<SourceLocation>,
    #[case] loc_b: Option<SourceLocation>,
) {
    let mut a = evidence("a", "AC-2", "password rotation enforced every ninety days", "policy");
    let mut b = evidence("b", "SC-7", "perimeter firewall diagram attached below", "diagram");
    a.source_location = loc_a;
    b.source_location = loc_b;

    assert!(calculate_similarity(&a, &b) < 0.8);

    let records = vec![a, b];
    let output = deduplicate(&records, &DeduplicationOptions::default()).unwrap();
    assert_eq!(output, records);
}

#[test]
fn test_near_duplicate_wording_is_grouped() {
    let a = evidence(
        "a",
        "IA-2",
        "Multi-factor authentication is enforced for all privileged accounts.",
        "policy",
    )
    .with_location(SourceLocation::new().with_chunk_type("paragraph").with_page(3));
    let b = evidence(
        "b",
        "IA-2",
        "Multi-factor authentication is enforced for all privileged accounts",
        "policy",
    )
    .with_location(SourceLocation::new().with_chunk_type("paragraph").with_page(4));

    let score = calculate_similarity(&a, &b);
    assert!(score > 0.95, "expected near-duplicate, got {}", score);
}

// === Resolver scenarios ===

#[test]
fn test_merge_policy_averages_quality_with_default() {
    let records = vec![
        evidence("a", "CM-6", "Baseline configuration enforced", "scan").with_quality(0.9),
        evidence("b", "CM-6", "Baseline configuration enforced", "scan").with_quality(0.7),
        evidence("c", "CM-6", "Baseline configuration enforced.", "scan"),
    ];

    let options = DeduplicationOptions::new().with_merge(true);
    let output = deduplicate(&records, &options).unwrap();
    assert_eq!(output.len(), 1);

    let merged = &output[0];
    assert_eq!(merged.id, "a");
    let quality = merged.quality_score.unwrap();
    assert!((quality - (0.9 + 0.7 + 0.5) / 3.0).abs() < EPS);
    assert_eq!(
        merged.evidence_text,
        format!(
            "Baseline configuration enforced{}Baseline configuration enforced.",
            MERGE_SEPARATOR
        )
    );

    let provenance = &merged.source_location.as_ref().unwrap().merged_from;
    let sources: Vec<&str> = provenance.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(sources, vec!["a", "b", "c"]);
}

#[test]
fn test_selection_by_relevance() {
    let records = vec![
        evidence("a", "AU-6", "Audit logs reviewed weekly", "note")
            .with_quality(0.9)
            .with_relevance(0.2),
        evidence("b", "AU-6", "Audit logs reviewed weekly", "note")
            .with_quality(0.1)
            .with_relevance(0.6),
    ];

    let by_quality = deduplicate(&records, &DeduplicationOptions::default()).unwrap();
    assert_eq!(ids(&by_quality), vec!["a"]);

    let options = DeduplicationOptions::new().with_preserve_highest_quality(false);
    let by_relevance = deduplicate(&records, &options).unwrap();
    assert_eq!(ids(&by_relevance), vec!["b"]);
}

// === Group cap ===

fn capped_batch() -> Vec<EvidenceRecord> {
    let topics = [
        "disk encryption enabled on laptops",
        "quarterly vendor review completed",
        "backup restore test passed",
        "phishing simulation results recorded",
    ];

    let mut records = Vec::new();
    for (i, topic) in topics.iter().enumerate() {
        records.push(evidence(&format!("g{}a", i), "CTRL", topic, "policy"));
        records.push(evidence(&format!("g{}b", i), "CTRL", topic, "policy"));
    }
    records.push(evidence("solo", "OTHER", "zebra quokka", "photo"));
    records
}

#[test]
fn test_group_cap_pass_through() {
    let records = capped_batch();
    let options = DeduplicationOptions::new()
        .with_max_groups(2)
        .with_overflow_policy(OverflowPolicy::PassThrough);

    let outcome = deduplicate_detailed(&records, &options).unwrap();
    assert_eq!(outcome.stats.groups_found, 4);
    assert_eq!(outcome.stats.groups_resolved, 2);
    assert_eq!(outcome.stats.groups_overflowed, 2);
    assert_eq!(
        ids(&outcome.records),
        vec!["g0a", "g1a", "g2a", "g2b", "g3a", "g3b", "solo"]
    );
    assert!(outcome.groups[2..]
        .iter()
        .all(|g| g.disposition == GroupDisposition::PassedThrough));
}

#[test]
fn test_group_cap_drop_excludes_overflow_groups() {
    let records = capped_batch();
    let options = DeduplicationOptions::new()
        .with_max_groups(2)
        .with_overflow_policy(OverflowPolicy::Drop);

    let outcome = deduplicate_detailed(&records, &options).unwrap();
    assert_eq!(ids(&outcome.records), vec!["g0a", "g1a", "solo"]);
    assert_eq!(outcome.stats.records_dropped, 4);
    assert!(outcome.groups[2..]
        .iter()
        .all(|g| g.disposition == GroupDisposition::Dropped));
}

#[test]
fn test_zero_cap_resolves_nothing() {
    let records = capped_batch();
    let options = DeduplicationOptions::new().with_max_groups(0);
    let output = deduplicate(&records, &options).unwrap();
    assert_eq!(output, records);
}

// === Reporter ===

#[test]
fn test_reporter_orders_by_similarity() {
    let records = vec![
        evidence("a", "RA-5", "monthly vulnerability scan of production hosts", "scan"),
        evidence("b", "RA-5", "monthly vulnerability scan of production hosts", "scan"),
        evidence("c", "RA-5", "weekly vulnerability scan of staging hosts", "scan"),
        evidence("d", "PL-2", "system security plan approved", "policy"),
    ];

    let pairs = find_potential_duplicates(&records, 0.5).unwrap();
    assert!(!pairs.is_empty());
    assert_eq!((pairs[0].a.id.as_str(), pairs[0].b.id.as_str()), ("a", "b"));
    assert_eq!(pairs[0].similarity, 1.0);
    assert!(pairs.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    assert!(pairs.iter().all(|p| p.similarity >= 0.5));
}

#[test]
fn test_reporter_does_not_change_records() {
    let records = capped_batch();
    let snapshot = records.clone();
    let _ = find_potential_duplicates(&records, 0.1).unwrap();
    assert_eq!(records, snapshot);
}

// === Property-Based Tests ===

fn location_strategy() -> impl Strategy<Value = Option<SourceLocation>> {
    proptest::option::of(
        (
            proptest::option::of(prop_oneof!["paragraph", "table", "heading"]),
            proptest::option::of("[A-Za-z0-9 .]{0,20}"),
            proptest::option::of(0i64..200),
            proptest::option::of("[a-z0-9]{1,6}"),
        )
            .prop_map(|(chunk_type, section_title, page_number, chunk_id)| SourceLocation {
                chunk_type,
                section_title,
                page_number,
                chunk_id,
                merged_from: Vec::new(),
            }),
    )
}

fn record_strategy() -> impl Strategy<Value = EvidenceRecord> {
    (
        "[a-z0-9]{1,8}",
        prop_oneof!["AC-2", "AU-6", "SC-7"],
        "[A-Za-z0-9 ,.!?-]{0,60}",
        prop_oneof!["policy", "scan", "note"],
        proptest::option::of(0.0f64..=1.0),
        proptest::option::of(0.0f64..=1.0),
        location_strategy(),
    )
        .prop_map(|(id, control, text, kind, quality, relevance, location)| {
            EvidenceRecord {
                id: id.clone(),
                document_id: format!("doc-{}", id),
                control_id: control,
                evidence_text: text,
                evidence_type: kind,
                quality_score: quality,
                relevance_score: relevance,
                source_location: location,
            }
        })
}

proptest! {
    #[test]
    fn test_score_reflexive(record in record_strategy()) {
        let copy = record.clone();
        prop_assert_eq!(calculate_similarity(&record, &copy), 1.0);
    }

    #[test]
    fn test_score_symmetric(a in record_strategy(), b in record_strategy()) {
        prop_assert_eq!(calculate_similarity(&a, &b), calculate_similarity(&b, &a));
    }

    #[test]
    fn test_score_bounded(a in record_strategy(), b in record_strategy()) {
        let score = calculate_similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&score), "score out of range: {}", score);
    }

    #[test]
    fn test_normalize_idempotent(text in "\\PC{0,40}") {
        let once = normalize_text(&text);
        prop_assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn test_reporter_sorted(records in proptest::collection::vec(record_strategy(), 3..8)) {
        let pairs = find_potential_duplicates(&records, 0.0).unwrap();
        prop_assert_eq!(pairs.len(), records.len() * (records.len() - 1) / 2);
        prop_assert!(pairs.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn test_output_ids_trace_to_input(
        records in proptest::collection::vec(record_strategy(), 0..8),
        merge in any::<bool>(),
    ) {
        let options = DeduplicationOptions::new().with_merge(merge).with_threshold(0.6);
        let output = deduplicate(&records, &options).unwrap();
        prop_assert!(output.len() <= records.len());
        for record in &output {
            prop_assert!(records.iter().any(|r| r.id == record.id));
        }
    }
}
