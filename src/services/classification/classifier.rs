// Classifier Adapter
// Maps raw model output onto the normalized verdict states

use crate::models::Verdict;
use crate::services::providers::TextGenerator;
use tracing::warn;

/// How much of a prompt to include in anomaly logs.
const PROMPT_LOG_CHARS: usize = 120;

/// Normalize decoded model output into a verdict by substring containment,
/// in precedence order: "yes" wins over everything, "not relevant" must be
/// checked before "no" (it contains the letters but not the meaning of a
/// plain negative).
pub fn parse_verdict(raw: &str) -> Verdict {
    let answer = raw.trim();
    if answer.contains("yes") {
        Verdict::Yes
    } else if answer.contains("not relevant") {
        Verdict::NotRelevant
    } else if answer.contains("no") {
        Verdict::No
    } else {
        Verdict::Unparseable
    }
}

/// Invoke the generation capability and normalize its output. Transport
/// failures and unrecognized outputs are logged with enough context to
/// diagnose them, then folded to `Unparseable` — callers never see an error
/// from a single classification.
pub async fn classify<G>(generator: &G, prompt: &str) -> Verdict
where
    G: TextGenerator + ?Sized,
{
    match generator.generate(prompt).await {
        Ok(raw) => {
            let verdict = parse_verdict(&raw);
            if verdict == Verdict::Unparseable {
                warn!(
                    prompt_head = %prompt_head(prompt),
                    raw_output = %raw.trim(),
                    "model output matched none of yes / no / not relevant"
                );
            }
            verdict
        }
        Err(e) => {
            warn!(
                prompt_head = %prompt_head(prompt),
                "model call failed: {}",
                e
            );
            Verdict::Unparseable
        }
    }
}

fn prompt_head(prompt: &str) -> String {
    let mut head: String = prompt.chars().take(PROMPT_LOG_CHARS).collect();
    if prompt.chars().count() > PROMPT_LOG_CHARS {
        head.push_str("...");
    }
    head.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::ProviderError;
    use async_trait::async_trait;

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::MissingContent)
        }
    }

    #[test]
    fn test_parse_yes() {
        assert_eq!(parse_verdict("yes"), Verdict::Yes);
        assert_eq!(parse_verdict("  yes, the patient smokes"), Verdict::Yes);
    }

    #[test]
    fn test_parse_not_relevant_before_no() {
        // "not" contains the substring "no"; the check order keeps this from
        // collapsing into a plain negative.
        assert_eq!(parse_verdict("not relevant"), Verdict::NotRelevant);
    }

    #[test]
    fn test_parse_no() {
        assert_eq!(parse_verdict("no"), Verdict::No);
        assert_eq!(parse_verdict("the answer is no."), Verdict::No);
    }

    #[test]
    fn test_yes_takes_precedence() {
        assert_eq!(parse_verdict("yes and no"), Verdict::Yes);
    }

    #[test]
    fn test_unrecognized_is_unparseable() {
        assert_eq!(parse_verdict("maybe"), Verdict::Unparseable);
        assert_eq!(parse_verdict(""), Verdict::Unparseable);
    }

    #[tokio::test]
    async fn test_classify_normalizes_output() {
        assert_eq!(classify(&FixedGenerator("yes"), "p").await, Verdict::Yes);
        assert_eq!(
            classify(&FixedGenerator("not relevant"), "p").await,
            Verdict::NotRelevant
        );
    }

    #[tokio::test]
    async fn test_classify_folds_transport_failure() {
        assert_eq!(classify(&FailingGenerator, "p").await, Verdict::Unparseable);
    }
}
