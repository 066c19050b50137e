// Sentence Segmenter Service Client
// External sentence-segmentation capability with a local rule-based fallback

use crate::services::text_processor;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Segmenter service URL
const DEFAULT_SEGMENTER_URL: &str = "http://127.0.0.1:8788";

/// Shared HTTP client
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn get_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default()
    })
}

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("failed to call segmenter service: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("segmenter service returned error: {0}")]
    ServiceError(u16),
    #[error("failed to parse segmenter response: {0}")]
    ParseError(String),
}

/// The sentence-segmentation capability: a block of text in, its natural
/// language sentences out, in order.
#[async_trait]
pub trait Segmenter: Send + Sync {
    async fn segment(&self, text: &str) -> Result<Vec<String>, SegmentError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentRequest {
    text: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct SegmentResponse {
    sentences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Client for the external sentence-segmentation service.
pub struct SegmenterClient {
    base_url: String,
    language: String,
}

impl Default for SegmenterClient {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENTER_URL, "en")
    }
}

impl SegmenterClient {
    pub fn new(base_url: &str, language: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
        }
    }

    /// Check whether the service is reachable
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match get_client().get(&url).send().await {
            Ok(resp) => resp
                .json::<HealthResponse>()
                .await
                .map(|h| h.status == "ok")
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn segment_sentences(&self, text: &str) -> Result<Vec<String>, SegmentError> {
        let url = format!("{}/segment", self.base_url);
        let request = SegmentRequest {
            text: text.to_string(),
            language: self.language.clone(),
        };

        let response = get_client().post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(SegmentError::ServiceError(response.status().as_u16()));
        }

        let result: SegmentResponse = response
            .json()
            .await
            .map_err(|e| SegmentError::ParseError(e.to_string()))?;

        Ok(result.sentences)
    }
}

#[async_trait]
impl Segmenter for SegmenterClient {
    async fn segment(&self, text: &str) -> Result<Vec<String>, SegmentError> {
        self.segment_sentences(text).await
    }
}

/// Local punctuation-rule segmenter, used standalone or as the fallback when
/// the segmentation service is unreachable.
#[derive(Debug, Clone, Default)]
pub struct RuleSegmenter;

#[async_trait]
impl Segmenter for RuleSegmenter {
    async fn segment(&self, text: &str) -> Result<Vec<String>, SegmentError> {
        Ok(text_processor::split_sentences(text))
    }
}

/// Segment via the service, falling back to local rules when it fails.
/// Preprocessing must keep working without the external capability, so a
/// transport failure is logged rather than propagated.
pub async fn segment_with_fallback(segmenter: &dyn Segmenter, text: &str) -> Vec<String> {
    match segmenter.segment(text).await {
        Ok(sentences) => sentences,
        Err(e) => {
            warn!("segmenter unavailable ({}), falling back to local rules", e);
            text_processor::split_sentences(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = SegmenterClient::default();
        assert_eq!(client.base_url, DEFAULT_SEGMENTER_URL);
        assert_eq!(client.language, "en");
    }

    #[tokio::test]
    async fn test_rule_segmenter_splits_sentences() {
        let segmenter = RuleSegmenter;
        let sentences = segmenter
            .segment("Patient reports pain. Denies fever.")
            .await
            .unwrap();
        assert_eq!(sentences, vec!["Patient reports pain.", "Denies fever."]);
    }

    #[tokio::test]
    async fn test_fallback_when_service_unavailable() {
        // Points at an unroutable service; must still return rule-based output.
        let client = SegmenterClient::new("http://127.0.0.1:1", "en");
        let sentences = segment_with_fallback(&client, "First sentence. Second one.").await;
        assert_eq!(sentences.len(), 2);
    }
}
