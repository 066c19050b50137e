// Category Evaluator
// Orchestrates preprocessing, chunking, query formatting and classification
// for one category across a list of raw text blocks

use crate::models::{DocumentVerdict, EvalOptions, EvaluationReport, SkipReason, UnitReport, Verdict};
use crate::services::classification::classifier::classify;
use crate::services::classification::query::format_query;
use crate::services::providers::TextGenerator;
use crate::services::question_bank::{QuestionBank, QuestionBankError};
use crate::services::sentence_segmenter::{segment_with_fallback, Segmenter};
use crate::services::text_processor::{divide_tokens, refine_fragments, word_tokens};
use std::sync::Arc;
use tracing::{info, warn};

/// Evaluates raw text blocks against categories from a shared question bank.
///
/// Classification is strictly sequential: items within a unit and units within
/// a call are awaited in order, matching the offline batch workload this was
/// built for. The bank is read-only after construction.
pub struct CategoryEvaluator<S, G> {
    bank: Arc<QuestionBank>,
    segmenter: S,
    generator: G,
    opts: EvalOptions,
}

impl<S, G> CategoryEvaluator<S, G>
where
    S: Segmenter,
    G: TextGenerator,
{
    pub fn new(bank: Arc<QuestionBank>, segmenter: S, generator: G, opts: EvalOptions) -> Self {
        Self {
            bank,
            segmenter,
            generator,
            opts,
        }
    }

    pub fn options(&self) -> &EvalOptions {
        &self.opts
    }

    /// Evaluate every unit against one category, producing one document
    /// verdict per input unit, in input order.
    ///
    /// The only propagating failure is an unknown category, which is a
    /// caller/configuration bug; every anomaly below that surfaces through
    /// logs and the report's diagnostics instead.
    pub async fn evaluate(
        &self,
        units: &[String],
        category: &str,
    ) -> Result<EvaluationReport, QuestionBankError> {
        // Resolve the question once, before touching any unit.
        let question = self.bank.question(category)?.to_string();

        let mut verdicts = Vec::with_capacity(units.len());
        let mut unit_reports = Vec::with_capacity(units.len());

        for (unit_index, unit) in units.iter().enumerate() {
            let (items, skips) = self.collect_items(unit).await;

            if items.is_empty() {
                // No usable text is absence of evidence, not an error; the
                // model is never consulted for such a unit.
                verdicts.push(DocumentVerdict::Negative);
                unit_reports.push(UnitReport {
                    unit_index,
                    verdict: DocumentVerdict::Negative,
                    item_verdicts: vec![],
                    skips,
                    unparseable: 0,
                });
                continue;
            }

            let mut item_verdicts = Vec::with_capacity(items.len());
            let mut unparseable = 0usize;

            for item in &items {
                let prompt = format_query(&question, item);
                let verdict = classify(&self.generator, &prompt).await;
                if verdict == Verdict::Unparseable {
                    unparseable += 1;
                }
                item_verdicts.push(verdict);
            }

            let verdict = if item_verdicts.iter().any(|v| v.is_positive()) {
                DocumentVerdict::Positive
            } else {
                DocumentVerdict::Negative
            };

            if unparseable > 0 {
                warn!(
                    category,
                    unit_index, unparseable, "unit produced unparseable model outputs"
                );
            }

            verdicts.push(verdict);
            unit_reports.push(UnitReport {
                unit_index,
                verdict,
                item_verdicts,
                skips,
                unparseable,
            });
        }

        info!(
            category,
            units = units.len(),
            positive = verdicts
                .iter()
                .filter(|v| **v == DocumentVerdict::Positive)
                .count(),
            "category evaluation finished"
        );

        Ok(EvaluationReport {
            category: category.to_string(),
            verdicts,
            units: unit_reports,
        })
    }

    /// Preprocess one raw text block into classifiable items: segment into
    /// sentences, refine into fragments, drop fragments too short to carry
    /// clinical signal, and window fragments that exceed the token budget.
    async fn collect_items(&self, unit: &str) -> (Vec<String>, Vec<SkipReason>) {
        let sentences = segment_with_fallback(&self.segmenter, unit).await;
        let fragments = refine_fragments(&sentences);

        let mut items = Vec::new();
        let mut skips = Vec::new();

        for fragment in &fragments {
            let fragment = fragment.trim();
            let tokens = word_tokens(fragment);

            if tokens.is_empty() {
                skips.push(SkipReason::Empty);
                continue;
            }
            if tokens.len() < self.opts.min_token_length {
                skips.push(SkipReason::TooShort {
                    tokens: tokens.len(),
                });
                continue;
            }

            if tokens.len() > self.opts.token_length {
                items.extend(divide_tokens(&tokens, self.opts.token_length));
            } else {
                items.push(fragment.to_string());
            }
        }

        (items, skips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::ProviderError;
    use crate::services::sentence_segmenter::RuleSegmenter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock generator: answers "yes" when the prompt contains any trigger
    /// word, "no" otherwise, and counts invocations.
    struct KeywordGenerator {
        trigger: &'static str,
        calls: AtomicUsize,
    }

    impl KeywordGenerator {
        fn new(trigger: &'static str) -> Self {
            Self {
                trigger,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for KeywordGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if prompt.contains(self.trigger) {
                Ok("yes".to_string())
            } else {
                Ok("no".to_string())
            }
        }
    }

    /// Mock generator with a fixed answer per call, cycling.
    struct ScriptedGenerator {
        answers: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answers[i % self.answers.len()].to_string())
        }
    }

    fn smoking_bank() -> Arc<QuestionBank> {
        Arc::new(
            QuestionBank::new([(
                "smoking".to_string(),
                "Does the patient smoke?".to_string(),
            )])
            .unwrap(),
        )
    }

    fn evaluator_with<G: TextGenerator>(
        generator: G,
    ) -> CategoryEvaluator<RuleSegmenter, G> {
        CategoryEvaluator::new(
            smoking_bank(),
            RuleSegmenter,
            generator,
            EvalOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_positive_when_any_item_answers_yes() {
        let generator = KeywordGenerator::new("smokes");
        let evaluator = evaluator_with(generator);

        let units =
            vec!["Patient smokes two packs daily  Patient denies alcohol use.".to_string()];
        let report = evaluator.evaluate(&units, "smoking").await.unwrap();

        assert_eq!(report.verdicts, vec![DocumentVerdict::Positive]);
        // Double-space split yields two fragments, each classified once.
        assert_eq!(evaluator.generator.call_count(), 2);
        assert_eq!(
            report.units[0].item_verdicts,
            vec![Verdict::Yes, Verdict::No]
        );
    }

    #[tokio::test]
    async fn test_negative_when_no_item_answers_yes() {
        let generator = KeywordGenerator::new("transplant");
        let evaluator = evaluator_with(generator);

        let units = vec!["Patient smokes daily.  Patient denies alcohol use.".to_string()];
        let report = evaluator.evaluate(&units, "smoking").await.unwrap();

        assert_eq!(report.verdicts, vec![DocumentVerdict::Negative]);
    }

    #[tokio::test]
    async fn test_short_unit_is_negative_without_model_calls() {
        let generator = KeywordGenerator::new("smokes");
        let evaluator = evaluator_with(generator);

        let units = vec!["ok".to_string()];
        let report = evaluator.evaluate(&units, "smoking").await.unwrap();

        assert_eq!(report.verdicts, vec![DocumentVerdict::Negative]);
        assert_eq!(evaluator.generator.call_count(), 0);
        assert_eq!(
            report.units[0].skips,
            vec![SkipReason::TooShort { tokens: 1 }]
        );
    }

    #[tokio::test]
    async fn test_long_unit_is_windowed_into_two_chunks() {
        let generator = KeywordGenerator::new("never-present");
        let evaluator = evaluator_with(generator);

        // 700 tokens, no sentence punctuation: one fragment, two 350-token windows.
        let long_unit: String = (0..700)
            .map(|i| format!("tok{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let report = evaluator.evaluate(&[long_unit], "smoking").await.unwrap();

        assert_eq!(evaluator.generator.call_count(), 2);
        assert_eq!(report.units[0].item_verdicts.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_category_propagates() {
        let generator = KeywordGenerator::new("smokes");
        let evaluator = evaluator_with(generator);

        let err = evaluator
            .evaluate(&["Patient smokes daily and often.".to_string()], "housing")
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionBankError::UnknownCategory(_)));
    }

    #[tokio::test]
    async fn test_unparseable_output_counts_as_negative_with_diagnostic() {
        let generator = ScriptedGenerator {
            answers: vec!["maybe"],
            calls: AtomicUsize::new(0),
        };
        let evaluator = evaluator_with(generator);

        let units = vec!["Patient smokes daily and often.".to_string()];
        let report = evaluator.evaluate(&units, "smoking").await.unwrap();

        assert_eq!(report.verdicts, vec![DocumentVerdict::Negative]);
        assert_eq!(report.units[0].unparseable, 1);
        assert_eq!(report.unparseable_total(), 1);
    }

    #[tokio::test]
    async fn test_verdict_sequence_matches_input_length_and_order() {
        let generator = KeywordGenerator::new("smokes");
        let evaluator = evaluator_with(generator);

        let units = vec![
            "Patient smokes daily and often.".to_string(),
            "ok".to_string(),
            "Patient denies tobacco use entirely.".to_string(),
        ];
        let report = evaluator.evaluate(&units, "smoking").await.unwrap();

        assert_eq!(
            report.verdicts,
            vec![
                DocumentVerdict::Positive,
                DocumentVerdict::Negative,
                DocumentVerdict::Negative,
            ]
        );
        assert_eq!(report.units.len(), 3);
        assert_eq!(report.units[1].unit_index, 1);
    }
}
