//! evidence-dedup: Similarity scoring and deduplication for compliance evidence
//!
//! Given a batch of evidence records collected for compliance controls, this
//! crate finds near-duplicates and reduces the batch, either by keeping the best
//! record of each duplicate cluster or by merging the cluster into a single
//! record that remembers where its parts came from.
//!
//! The pipeline runs in one direction:
//!
//! 1. [`normalization`] canonicalizes free text
//! 2. [`similarity`] scores record pairs on text, type, control, and location
//! 3. [`grouping`] sweeps the batch into similarity groups
//! 4. [`resolution`] turns each group into one output record
//! 5. [`orchestration`] ties the steps together and reports duplicate pairs
//!
//! Everything here is a pure in-memory computation. Records are borrowed and
//! never mutated; every call returns a new collection.
//!
//! # Example
//!
//! ```
//! use evidence_dedup::{deduplicate, DeduplicationOptions, EvidenceRecord};
//!
//! let a = EvidenceRecord::new("e1", "doc-1", "AC-2", "Accounts are reviewed quarterly.", "policy");
//! let b = EvidenceRecord::new("e2", "doc-2", "AC-2", "Accounts are reviewed quarterly", "policy");
//!
//! let output = deduplicate(&[a, b], &DeduplicationOptions::default()).unwrap();
//! assert_eq!(output.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod grouping;
pub mod normalization;
pub mod orchestration;
pub mod record;
pub mod resolution;
pub mod similarity;

pub use config::{CandidateStrategy, DeduplicationOptions, OverflowPolicy};
pub use error::{DedupError, DedupResult};
pub use grouping::{find_similarity_groups, SimilarityGroup};
pub use normalization::normalize_text;
pub use orchestration::{
    deduplicate, deduplicate_detailed, find_potential_duplicates, DeduplicationOutcome,
    DeduplicationStats, DuplicatePair, GroupDisposition, GroupSummary,
};
pub use record::{EvidenceRecord, MergeProvenance, SourceLocation};
pub use resolution::{merge_group, resolve_group, select_best, MERGE_SEPARATOR};
pub use similarity::{calculate_similarity, explain_similarity, SimilarityBreakdown};
