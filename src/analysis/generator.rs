use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{config::GeminiConfig, error::UpstreamError};

const PROVIDER: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Prompt-in, text-out generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// Gemini `generateContent` over REST.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, cfg: &GeminiConfig) -> Self {
        Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

fn extract_text(res: GenerateResponse) -> Result<String, UpstreamError> {
    let text: String = res
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(UpstreamError::Malformed {
            provider: PROVIDER,
            message: "response carried no text".into(),
        });
    }
    Ok(text)
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let res = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        let parsed: GenerateResponse = res.json().await.map_err(|e| UpstreamError::Malformed {
            provider: PROVIDER,
            message: e.to_string(),
        })?;
        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<String, UpstreamError> {
        extract_text(serde_json::from_str(raw).unwrap())
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let raw = r###"{"candidates":[{"content":{"parts":[{"text":"## Executive"},{"text":" Summary"}]}}]}"###;
        assert_eq!(parse(raw).unwrap(), "## Executive Summary");
    }

    #[test]
    fn blocked_or_empty_responses_are_malformed() {
        assert!(matches!(parse(r#"{}"#), Err(UpstreamError::Malformed { .. })));
        assert!(matches!(
            parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#),
            Err(UpstreamError::Malformed { .. })
        ));
        assert!(matches!(
            parse(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#),
            Err(UpstreamError::Malformed { .. })
        ));
    }

    #[test]
    fn endpoint_names_the_model() {
        let client = GeminiClient::new(
            reqwest::Client::new(),
            &GeminiConfig {
                api_key: "k".into(),
                model: "gemini-1.5-flash".into(),
            },
        );
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
