// Classification Module
// Category classification core organized into specialized submodules:
// - query: renders the fixed instruction/context/question/choices prompt
// - classifier: maps raw model output onto normalized verdicts
// - evaluator: orchestrates preprocessing, chunking and OR-reduction

pub mod classifier;
pub mod evaluator;
pub mod query;

pub use classifier::{classify, parse_verdict};
pub use evaluator::CategoryEvaluator;
pub use query::{format_query, CHOICES, INSTRUCTION};
