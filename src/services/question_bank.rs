// Question Bank Service
// Loads the Category -> Question table from a CSV resource

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum QuestionBankError {
    #[error("failed to read question table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse question table: {0}")]
    Csv(#[from] csv::Error),
    #[error("duplicate category in question table: {0}")]
    DuplicateCategory(String),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("question table contains no rows")]
    Empty,
}

/// One row of the question table.
#[derive(Debug, Clone, Deserialize)]
struct QuestionRow {
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Question")]
    question: String,
}

/// Immutable Category -> Question mapping, loaded once at startup and shared
/// read-only across all evaluations (wrap in `Arc` to share).
///
/// Duplicate categories are rejected at load time instead of silently
/// overwriting: two questions for the same category is a table authoring bug,
/// and last-wins would hide it.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: HashMap<String, String>,
}

impl QuestionBank {
    /// Build a bank from (category, question) pairs.
    pub fn new<I>(rows: I) -> Result<Self, QuestionBankError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut questions = HashMap::new();
        for (category, question) in rows {
            if questions.insert(category.clone(), question).is_some() {
                return Err(QuestionBankError::DuplicateCategory(category));
            }
        }
        if questions.is_empty() {
            return Err(QuestionBankError::Empty);
        }
        Ok(Self { questions })
    }

    /// Load the bank from a CSV file with `Category` and `Question` columns.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, QuestionBankError> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;

        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: QuestionRow = record?;
            rows.push((row.category, row.question));
        }

        let bank = Self::new(rows)?;
        info!(
            path = %path.display(),
            categories = bank.len(),
            "question bank loaded"
        );
        Ok(bank)
    }

    /// Look up the canonical question for a category. A missing key is a
    /// caller/configuration bug and must propagate.
    pub fn question(&self, category: &str) -> Result<&str, QuestionBankError> {
        self.questions
            .get(category)
            .map(|q| q.as_str())
            .ok_or_else(|| QuestionBankError::UnknownCategory(category.to_string()))
    }

    pub fn contains(&self, category: &str) -> bool {
        self.questions.contains_key(category)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Category names in no particular order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.questions.keys().map(|k| k.as_str())
    }
}
