//! Configuration for evidence deduplication
//!
//! Options are plain data with documented defaults. They can be built in code
//! or loaded from JSON/TOML; missing fields take their default value.

use serde::{Deserialize, Serialize};

use crate::error::{DedupError, DedupResult};

/// What happens to groups found beyond `max_similarity_groups`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverflowPolicy {
    /// Members of groups past the cap are returned unchanged
    #[default]
    PassThrough,
    /// Members of groups past the cap are left out of the output entirely
    Drop,
}

/// Which record pairs are scored during grouping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateStrategy {
    /// Score every pair, O(n²)
    #[default]
    Exhaustive,
    /// Only score pairs whose normalized texts share at least one token
    SharedToken,
}

/// Options for a deduplication run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeduplicationOptions {
    /// Minimum composite score for two records to be grouped
    pub similarity_threshold: f64,
    /// Rank by quality (true) or relevance (false) when selecting
    pub preserve_highest_quality: bool,
    /// Merge groups into one record instead of selecting the best member
    pub merge_similar_items: bool,
    /// Number of groups resolved into output, in discovery order
    pub max_similarity_groups: usize,
    /// Handling of groups beyond the cap
    pub overflow_policy: OverflowPolicy,
    /// Pair pre-filter used by the grouping sweep
    pub candidate_strategy: CandidateStrategy,
}

impl Default for DeduplicationOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            preserve_highest_quality: true,
            merge_similar_items: false,
            max_similarity_groups: 50,
            overflow_policy: OverflowPolicy::default(),
            candidate_strategy: CandidateStrategy::default(),
        }
    }
}

impl DeduplicationOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge_similar_items = merge;
        self
    }

    pub fn with_preserve_highest_quality(mut self, preserve: bool) -> Self {
        self.preserve_highest_quality = preserve;
        self
    }

    pub fn with_max_groups(mut self, max_groups: usize) -> Self {
        self.max_similarity_groups = max_groups;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn with_candidate_strategy(mut self, strategy: CandidateStrategy) -> Self {
        self.candidate_strategy = strategy;
        self
    }

    /// Load options from a JSON string
    pub fn from_json(json_str: &str) -> DedupResult<Self> {
        let options: Self = serde_json::from_str(json_str)?;
        options.validate()?;
        Ok(options)
    }

    /// Serialize options to JSON
    pub fn to_json(&self) -> DedupResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load options from a TOML string
    pub fn from_toml(toml_str: &str) -> DedupResult<Self> {
        let options: Self = toml::from_str(toml_str)?;
        options.validate()?;
        Ok(options)
    }

    /// Serialize options to TOML
    pub fn to_toml(&self) -> DedupResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate option values
    ///
    /// Thresholds outside [0, 1] are legal and simply match everything or
    /// nothing. Only values that cannot be compared are rejected.
    pub fn validate(&self) -> DedupResult<()> {
        if self.similarity_threshold.is_nan() {
            return Err(DedupError::InvalidOptions(
                "similarityThreshold must be a number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a bare threshold for the duplicate reporter
pub(crate) fn validate_threshold(threshold: f64) -> DedupResult<()> {
    if threshold.is_nan() {
        return Err(DedupError::InvalidOptions(
            "threshold must be a number".to_string(),
        ));
    }
    Ok(())
}
