//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::prompt::EXTRACTION_PROMPT;
use super::{Extraction, Extractor, Result};
use crate::error::{ExtractionError, RcptError};
use crate::input::MediaKind;
use crate::models::config::ExtractionConfig;
use crate::usage::TokenUsage;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Extractor backed by the Gemini REST API.
pub struct GeminiExtractor {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    InlineData { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GeminiExtractor {
    /// Create a client for `model` at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> crate::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RcptError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Create a client from configuration, resolving the API key.
    pub fn from_config(config: &ExtractionConfig) -> crate::Result<Self> {
        let timeout = (config.request_timeout_secs > 0)
            .then(|| Duration::from_secs(config.request_timeout_secs));
        Self::new(
            config.api_base_url.clone(),
            config.model.clone(),
            config.resolve_api_key()?,
            timeout,
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract(&self, data: &[u8], kind: MediaKind, filename: &str) -> Result<Extraction> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: kind.mime_type(),
                            data: BASE64_STANDARD.encode(data),
                        },
                    },
                    RequestPart::Text {
                        text: EXTRACTION_PROMPT,
                    },
                ],
            }],
        };

        debug!(
            "Sending {} ({}, {} bytes) to {}",
            filename,
            kind.mime_type(),
            data.len(),
            self.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExtractionError::Request(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        let usage = response.usage_metadata.map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
            total_tokens: u
                .total_token_count
                .unwrap_or(u.prompt_token_count + u.candidates_token_count),
        });

        let parts: Vec<String> = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if parts.is_empty() {
            return Err(ExtractionError::MissingText);
        }

        let text = parts.concat();
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyResponse);
        }

        debug!(
            "Received {} chars for {} (usage: {:?})",
            text.len(),
            filename,
            usage
        );

        Ok(Extraction { text, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ImageFormat;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor(server: &MockServer) -> GeminiExtractor {
        GeminiExtractor::new(server.uri(), "gemini-2.0-flash", "test-key", None).unwrap()
    }

    fn text_response(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 1290,
                "candidatesTokenCount": 180,
                "totalTokenCount": 1470
            }
        })
    }

    #[tokio::test]
    async fn test_extract_image_with_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/v1beta/models/gemini-2\.0-flash:generateContent$"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"inline_data": {"mime_type": "image/png", "data": "AQID"}}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("```json\n{}\n```")))
            .expect(1)
            .mount(&server)
            .await;

        let result = extractor(&server)
            .extract(&[1, 2, 3], MediaKind::Image(ImageFormat::Png), "a.png")
            .await
            .unwrap();

        assert_eq!(result.text, "```json\n{}\n```");
        assert_eq!(
            result.usage,
            Some(TokenUsage {
                input_tokens: 1290,
                output_tokens: 180,
                total_tokens: 1470,
            })
        );
    }

    #[tokio::test]
    async fn test_extract_pdf_without_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"inline_data": {"mime_type": "application/pdf"}}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "{\"amount\": "}, {"text": "\"1\"}"}]}}]
            })))
            .mount(&server)
            .await;

        let result = extractor(&server)
            .extract(b"%PDF-1.7", MediaKind::Pdf, "a.pdf")
            .await
            .unwrap();

        assert_eq!(result.text, "{\"amount\": \"1\"}");
        assert_eq!(result.usage, None);
    }

    #[tokio::test]
    async fn test_total_tokens_defaults_to_sum() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "{}"}]}}],
                "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4}
            })))
            .mount(&server)
            .await;

        let result = extractor(&server)
            .extract(b"x", MediaKind::Pdf, "a.pdf")
            .await
            .unwrap();

        assert_eq!(result.usage.unwrap().total_tokens, 14);
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let err = extractor(&server)
            .extract(b"x", MediaKind::Pdf, "a.pdf")
            .await
            .unwrap_err();

        match err {
            ExtractionError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_candidates_is_missing_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let err = extractor(&server)
            .extract(b"x", MediaKind::Pdf, "a.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::MissingText));
    }

    #[tokio::test]
    async fn test_blank_text_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("  \n")))
            .mount(&server)
            .await;

        let err = extractor(&server)
            .extract(b"x", MediaKind::Pdf, "a.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = extractor(&server)
            .extract(b"x", MediaKind::Pdf, "a.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_request_error() {
        let extractor = GeminiExtractor::new(
            "http://127.0.0.1:9",
            "gemini-2.0-flash",
            "k",
            Some(Duration::from_secs(2)),
        )
        .unwrap();

        let err = extractor
            .extract(b"x", MediaKind::Pdf, "a.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::Request(_)));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = ExtractionConfig {
            api_key: None,
            api_key_env: "RCPT_TEST_UNSET_VARIABLE".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            GeminiExtractor::from_config(&config),
            Err(RcptError::Config(_))
        ));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let extractor =
            GeminiExtractor::new("https://example.test/", "gemini-2.0-flash", "k", None).unwrap();
        assert_eq!(
            extractor.endpoint(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
