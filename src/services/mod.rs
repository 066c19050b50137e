// notecat Core Services

pub mod classification;
pub mod config_store;
pub mod providers;
pub mod question_bank;
pub mod sentence_segmenter;
pub mod text_processor;

pub use config_store::*;
pub use providers::*;
pub use question_bank::*;
pub use sentence_segmenter::*;
pub use text_processor::*;

// Re-export classification module functions
pub use classification::{classify, format_query, parse_verdict, CategoryEvaluator};
