// Model Provider Service
// Text-in/text-out inference clients for the classifier capability

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

const TGI_DEFAULT_URL: &str = "http://127.0.0.1:8080/generate";
const COMPLETIONS_DEFAULT_URL: &str = "https://api.openai.com/v1/completions";

/// Answers are one of "yes" / "no" / "not relevant"; a short budget keeps the
/// decode cheap and discourages free-form output.
const ANSWER_MAX_NEW_TOKENS: i32 = 16;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
}

/// The text generation capability: prompt in, decoded model output out.
/// Any model endpoint that can answer the query template is substitutable.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
}

/// Parse a "name[:model]" provider spec string.
pub fn parse_provider(spec: &str) -> ProviderSpec {
    let parts: Vec<&str> = spec.splitn(2, ':').collect();
    if parts.len() == 2 {
        ProviderSpec {
            name: parts[0].to_string(),
            model: parts[1].to_string(),
        }
    } else {
        ProviderSpec {
            name: spec.to_string(),
            model: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResult {
    pub content: String,
    pub latency_ms: i64,
}

pub struct ProviderClient {
    client: Client,
    spec: ProviderSpec,
    tgi_url: String,
    completions_url: String,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new(ProviderSpec {
            name: "tgi".to_string(),
            model: String::new(),
        })
    }
}

impl ProviderClient {
    pub fn new(spec: ProviderSpec) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(80))
            .build()
            .unwrap_or_default();

        let tgi_url = env::var("NOTECAT_TGI_URL").unwrap_or_else(|_| TGI_DEFAULT_URL.to_string());
        let completions_url = env::var("NOTECAT_COMPLETIONS_URL")
            .unwrap_or_else(|_| COMPLETIONS_DEFAULT_URL.to_string());

        Self {
            client,
            spec,
            tgi_url,
            completions_url,
        }
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    /// Call a text-generation-inference style endpoint
    /// (`{"inputs": ..., "parameters": {...}}` -> `{"generated_text": ...}`).
    pub async fn call_tgi(&self, prompt: &str) -> Result<GenerateResult, ProviderError> {
        #[derive(Serialize)]
        struct TgiParameters {
            max_new_tokens: i32,
        }

        #[derive(Serialize)]
        struct TgiRequest<'a> {
            inputs: &'a str,
            parameters: TgiParameters,
        }

        #[derive(Deserialize)]
        struct TgiResponse {
            generated_text: Option<String>,
        }

        let request = TgiRequest {
            inputs: prompt,
            parameters: TgiParameters {
                max_new_tokens: ANSWER_MAX_NEW_TOKENS,
            },
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.tgi_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: TgiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = data.generated_text.ok_or(ProviderError::MissingContent)?;

        Ok(GenerateResult { content, latency_ms })
    }

    /// Call an OpenAI-compatible completions endpoint.
    pub async fn call_completions(
        &self,
        model: &str,
        api_key: &str,
        prompt: &str,
    ) -> Result<GenerateResult, ProviderError> {
        #[derive(Serialize)]
        struct CompletionRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            max_tokens: i32,
            temperature: f64,
        }

        #[derive(Deserialize)]
        struct CompletionResponse {
            choices: Option<Vec<CompletionChoice>>,
        }

        #[derive(Deserialize)]
        struct CompletionChoice {
            text: Option<String>,
        }

        let request = CompletionRequest {
            model,
            prompt,
            max_tokens: ANSWER_MAX_NEW_TOKENS,
            temperature: 0.0,
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.completions_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = data
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.text)
            .ok_or(ProviderError::MissingContent)?;

        Ok(GenerateResult { content, latency_ms })
    }
}

#[async_trait]
impl TextGenerator for ProviderClient {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let result = match self.spec.name.as_str() {
            "openai" => {
                let api_key = get_api_key("openai").ok_or(ProviderError::MissingApiKey)?;
                let model = if self.spec.model.is_empty() {
                    "gpt-3.5-turbo-instruct"
                } else {
                    self.spec.model.as_str()
                };
                self.call_completions(model, &api_key, prompt).await?
            }
            _ => self.call_tgi(prompt).await?,
        };

        info!(
            provider = %self.spec.name,
            latency_ms = result.latency_ms,
            "model call completed"
        );
        Ok(result.content)
    }
}

/// Get API key from environment or config file
pub fn get_api_key(provider: &str) -> Option<String> {
    // Try environment variables first
    let env_keys = match provider {
        "openai" => vec!["OPENAI_API_KEY", "NOTECAT_OPENAI_API_KEY"],
        "tgi" => vec!["NOTECAT_TGI_API_KEY"],
        _ => vec![],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    // Try config file
    if let Some(config_dir) = super::ConfigStore::default_config_dir() {
        let store = super::ConfigStore::new(config_dir);
        if let Ok(Some(key)) = store.get_api_key(provider) {
            return Some(key);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        let spec = parse_provider("openai:flan-t5-xl");
        assert_eq!(spec.name, "openai");
        assert_eq!(spec.model, "flan-t5-xl");

        let spec2 = parse_provider("tgi");
        assert_eq!(spec2.name, "tgi");
        assert_eq!(spec2.model, "");
    }

    #[test]
    fn test_provider_client_creation() {
        let client = ProviderClient::default();
        assert_eq!(client.spec().name, "tgi");
        assert!(client.tgi_url.contains("generate"));
    }
}
