//! Evidence record types
//!
//! Records are owned by the caller. The engine reads them and produces new
//! derived records; wire names are camelCase to match the platform's JSON.

use serde::{Deserialize, Serialize};

/// A unit of text-based support material collected for a compliance control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    /// Unique identifier
    pub id: String,
    /// Document the evidence was pulled from
    #[serde(default)]
    pub document_id: String,
    /// Control the evidence supports
    #[serde(default)]
    pub control_id: String,
    /// Free-form evidence body (missing text reads as empty)
    #[serde(default)]
    pub evidence_text: String,
    /// Category tag (e.g. "policy", "screenshot", "scan")
    #[serde(default)]
    pub evidence_type: String,
    /// Extraction quality (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    /// Relevance to the control (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    /// Where in the document the evidence was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

impl EvidenceRecord {
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        control_id: impl Into<String>,
        evidence_text: impl Into<String>,
        evidence_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            control_id: control_id.into(),
            evidence_text: evidence_text.into(),
            evidence_type: evidence_type.into(),
            quality_score: None,
            relevance_score: None,
            source_location: None,
        }
    }

    pub fn with_quality(mut self, score: f64) -> Self {
        self.quality_score = Some(score);
        self
    }

    pub fn with_relevance(mut self, score: f64) -> Self {
        self.relevance_score = Some(score);
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.source_location = Some(location);
        self
    }

    /// Chunk identifier from the source location, if any
    pub fn chunk_id(&self) -> Option<&str> {
        self.source_location
            .as_ref()
            .and_then(|loc| loc.chunk_id.as_deref())
    }
}

/// Position of a piece of evidence inside its source document.
///
/// Every attribute is optional and compared independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    /// Records folded into this one by a merge (empty for unmerged records)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_from: Vec<MergeProvenance>,
}

impl SourceLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_type(mut self, chunk_type: impl Into<String>) -> Self {
        self.chunk_type = Some(chunk_type.into());
        self
    }

    pub fn with_section_title(mut self, title: impl Into<String>) -> Self {
        self.section_title = Some(title.into());
        self
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.page_number = Some(page);
        self
    }

    pub fn with_chunk_id(mut self, chunk_id: impl Into<String>) -> Self {
        self.chunk_id = Some(chunk_id.into());
        self
    }
}

/// Origin of one record that went into a merged record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeProvenance {
    pub id: String,
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
}

impl From<&EvidenceRecord> for MergeProvenance {
    fn from(record: &EvidenceRecord) -> Self {
        Self {
            id: record.id.clone(),
            document_id: record.document_id.clone(),
            chunk_id: record.chunk_id().map(str::to_string),
        }
    }
}
