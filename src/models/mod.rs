// notecat Data Models
// Verdicts, skip diagnostics and evaluation reports

use serde::{Deserialize, Serialize};

// ============ Evaluation Options ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalOptions {
    /// Maximum whitespace tokens per classified unit; longer fragments are
    /// re-expressed as token windows of this size.
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    /// Fragments with fewer tokens than this carry no clinical signal and are
    /// skipped without a model call.
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            token_length: 350,
            min_token_length: 4,
        }
    }
}

fn default_token_length() -> usize {
    350
}
fn default_min_token_length() -> usize {
    4
}

// ============ Verdicts ============

/// Normalized outcome of classifying one sentence unit against one category.
///
/// `Unparseable` is deliberately distinct from `No`/`NotRelevant`: all three
/// contribute nothing to the positive reduction, but unparseable model output
/// is an anomaly and is surfaced through a separate counter rather than being
/// silently mixed into the sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Yes,
    No,
    NotRelevant,
    Unparseable,
}

impl Verdict {
    pub fn is_positive(self) -> bool {
        matches!(self, Verdict::Yes)
    }
}

/// Final OR-reduced answer for one raw text block against one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentVerdict {
    Positive,
    Negative,
}

impl DocumentVerdict {
    /// Numeric form used by the original answer lists (1 = positive).
    pub fn as_u8(self) -> u8 {
        match self {
            DocumentVerdict::Positive => 1,
            DocumentVerdict::Negative => 0,
        }
    }
}

// ============ Skip Diagnostics ============

/// Why a preprocessed fragment was dropped before classification.
/// Skips are recorded instead of silently discarded so a unit that produced
/// no classifiable items is auditable after the fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum SkipReason {
    TooShort { tokens: usize },
    Empty,
}

// ============ Reports ============

/// Per-input-unit evaluation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitReport {
    pub unit_index: usize,
    pub verdict: DocumentVerdict,
    /// Verdicts for every classified item (sentence units and chunks), in
    /// processing order. Empty when the unit yielded no usable text.
    pub item_verdicts: Vec<Verdict>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skips: Vec<SkipReason>,
    /// Number of model outputs that matched none of yes / no / not relevant.
    #[serde(default)]
    pub unparseable: usize,
}

/// Full result of evaluating a list of raw text blocks against one category.
/// `verdicts` always has the same length and order as the evaluated input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub category: String,
    pub verdicts: Vec<DocumentVerdict>,
    pub units: Vec<UnitReport>,
}

impl EvaluationReport {
    pub fn unparseable_total(&self) -> usize {
        self.units.iter().map(|u| u.unparseable).sum()
    }
}
