use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_BASE_URL;
use crate::credential::Credential;
use crate::error::RelayError;

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

impl GeminiResponse {
    /// Text of the first candidate, all parts joined in order.
    fn into_text(self) -> Result<String, RelayError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(RelayError::MalformedResponse(format!(
                "prompt blocked ({})",
                reason
            )));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::MalformedResponse("no candidates returned".to_string()))?;

        let finish_reason = candidate.finish_reason;
        let texts: Vec<String> = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if texts.is_empty() {
            let detail = match finish_reason {
                Some(reason) => format!("candidate has no text (finish reason: {})", reason),
                None => "candidate has no text".to_string(),
            };
            return Err(RelayError::MalformedResponse(detail));
        }

        Ok(texts.concat())
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Credential,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Credential) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> anyhow::Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(self)
    }

    pub async fn query(&self, model: &str, prompt: &str) -> Result<String, RelayError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| {
                    if text.trim().is_empty() {
                        status.canonical_reason().unwrap_or("request failed").to_string()
                    } else {
                        text
                    }
                });
            return Err(RelayError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        gemini_response.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<String, RelayError> {
        serde_json::from_str::<GeminiResponse>(body).unwrap().into_text()
    }

    #[test]
    fn test_joins_parts_without_trimming() {
        let body = r#"{"candidates":[{
            "content":{"parts":[{"text":"  Hi"},{"text":" there \n"}],"role":"model"},
            "finishReason":"STOP"
        }]}"#;
        assert_eq!(parse(body).unwrap(), "  Hi there \n");
    }

    #[test]
    fn test_only_first_candidate_is_used() {
        let body = r#"{"candidates":[
            {"content":{"parts":[{"text":"one"}]}},
            {"content":{"parts":[{"text":"two"}]}}
        ]}"#;
        assert_eq!(parse(body).unwrap(), "one");
    }

    #[test]
    fn test_blocked_prompt() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = parse(body).unwrap_err();
        assert_eq!(
            err,
            RelayError::MalformedResponse("prompt blocked (SAFETY)".to_string())
        );
    }

    #[test]
    fn test_candidate_without_text_reports_finish_reason() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let err = parse(body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_no_candidates() {
        assert!(matches!(parse("{}"), Err(RelayError::MalformedResponse(_))));
    }

    #[test]
    fn test_request_envelope_shape() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: "Hello".to_string(),
                }],
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"contents":[{"role":"user","parts":[{"text":"Hello"}]}]})
        );
    }
}
