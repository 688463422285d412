//! Gemini `generateContent` adapter.
//!
//! The only place in the crate that knows the provider's wire format.  A call
//! is classified by HTTP status first (429, other 4xx, 5xx) and only a 2xx
//! body is parsed.  No retries happen here; the quota hint is handed back to
//! the caller instead.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{AiCallRequest, AiCallResult, ImageProvider, ProviderError};

/// Authentication header carrying the API key.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// MIME type assumed when the provider omits one.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Default endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Adapter configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Model id interpolated into the endpoint path.
    pub model: String,
    /// Endpoint root without trailing slash.
    pub base_url: String,
    /// Wall-clock bound on a whole call.
    pub timeout: Duration,
    /// Retry hint used when a 429 carries none.
    pub default_retry_after_secs: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("default_retry_after_secs", &self.default_retry_after_secs)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash-image".to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(60),
            default_retry_after_secs: 60,
        }
    }
}

/// HTTP client for the Gemini image models.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::Config("API key is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                after: self.config.timeout,
            }
        } else {
            ProviderError::UpstreamUnavailable {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl ImageProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_image(&self, request: AiCallRequest) -> Result<AiCallResult, ProviderError> {
        let start = Instant::now();
        let url = self.endpoint(&request.model);
        let body = build_request_body(&request);

        debug!(
            model = %request.model,
            has_source = request.source_image.is_some(),
            intensity = ?request.intensity.map(|i| i.weight()),
            "calling provider"
        );

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        info!(
            model = %request.model,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "provider responded"
        );

        if !status.is_success() {
            let err = classify_failure(status, &headers, &text, self.config.default_retry_after_secs);
            warn!(error = %err, "provider call failed");
            return Err(err);
        }

        let (image, mime_type) = extract_image(&text)?;
        Ok(AiCallResult {
            image,
            mime_type,
            elapsed: start.elapsed(),
        })
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

/// Untagged so each part serialises as either `{text}` or `{inlineData}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct ResponseInlineData {
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

fn build_request_body(request: &AiCallRequest) -> GenerateContentRequest {
    let mut parts = vec![Part::Text {
        text: request.prompt.clone(),
    }];
    if let Some(source) = &request.source_image {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: sniff_mime_type(source).to_owned(),
                data: STANDARD.encode(source),
            },
        });
    }

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            response_modalities: ["IMAGE", "TEXT"],
            image_config: request.sizing.as_ref().map(|s| ImageConfig {
                aspect_ratio: s.aspect_ratio.clone(),
            }),
        },
    }
}

/// Best-effort MIME type of an uploaded image from its magic bytes.
fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or(DEFAULT_MIME_TYPE)
}

// ── Response handling ─────────────────────────────────────────────────────────

/// Map a non-2xx response onto the error taxonomy.  The body is never
/// consulted to decide the class, only to enrich it.
pub fn classify_failure(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    default_retry_after_secs: u64,
) -> ProviderError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .or_else(|| retry_delay_from_body(body))
            .unwrap_or(default_retry_after_secs);
        return ProviderError::QuotaExceeded { retry_after_secs };
    }

    let message = provider_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("provider request failed")
            .to_owned()
    });

    if status.is_client_error() {
        ProviderError::ClientError {
            status: status.as_u16(),
            message,
            body: body.to_owned(),
        }
    } else {
        ProviderError::UpstreamUnavailable {
            status: Some(status.as_u16()),
            message,
        }
    }
}

/// Pull the image out of a 2xx body: the first part of the first candidate
/// that carries inline data.
pub fn extract_image(body: &str) -> Result<(Bytes, String), ProviderError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidProviderResponse(format!("malformed JSON: {e}")))?;

    let candidate = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| ProviderError::InvalidProviderResponse("no candidates".into()))?;

    let content = candidate
        .content
        .ok_or_else(|| ProviderError::InvalidProviderResponse("candidate has no content".into()))?;

    let inline = content
        .parts
        .into_iter()
        .find_map(|p| {
            p.inline_data
                .filter(|d| d.data.as_deref().is_some_and(|s| !s.trim().is_empty()))
        })
        .ok_or_else(|| ProviderError::InvalidProviderResponse("no inline image data".into()))?;

    let data = inline.data.unwrap_or_default();
    let image = STANDARD
        .decode(data.trim())
        .map_err(|e| ProviderError::InvalidProviderResponse(format!("image is not base64: {e}")))?;
    if image.is_empty() {
        return Err(ProviderError::InvalidProviderResponse("inline image data is empty".into()));
    }

    let mime_type = inline
        .mime_type
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_owned());

    Ok((Bytes::from(image), mime_type))
}

/// `error.message` from a Google-style error body.
fn provider_message(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(ToOwned::to_owned)
}

/// `RetryInfo.retryDelay` (e.g. `"17s"` or `"2.5s"`) from the error details.
fn retry_delay_from_body(body: &str) -> Option<u64> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")?
        .get("details")?
        .as_array()?
        .iter()
        .filter_map(|d| d.get("retryDelay").and_then(|v| v.as_str()))
        .find_map(|delay| {
            let secs: f64 = delay.trim().strip_suffix('s')?.parse().ok()?;
            Some(secs.max(0.0).ceil() as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ImageSizing;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn config_for(base_url: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".into(),
            model: "test-model".into(),
            base_url: base_url.to_owned(),
            timeout: Duration::from_secs(5),
            default_retry_after_secs: 42,
        }
    }

    fn image_body(bytes: &[u8], mime: Option<&str>) -> String {
        let mut inline = serde_json::json!({ "data": STANDARD.encode(bytes) });
        if let Some(mime) = mime {
            inline["mimeType"] = mime.into();
        }
        serde_json::json!({
            "candidates": [{
                "content": { "parts": [ { "text": "here you go" }, { "inlineData": inline } ] }
            }]
        })
        .to_string()
    }

    #[test]
    fn request_body_matches_wire_contract() {
        let request = AiCallRequest {
            sizing: Some(ImageSizing {
                aspect_ratio: "16:9".into(),
                width: 1024,
                height: 1024,
            }),
            source_image: Some(Bytes::from_static(PNG_MAGIC)),
            ..AiCallRequest::new("a cat", "test-model")
        };
        let json = serde_json::to_value(build_request_body(&request)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{ "parts": [
                    { "text": "a cat" },
                    { "inlineData": { "mimeType": "image/png", "data": STANDARD.encode(PNG_MAGIC) } }
                ]}],
                "generationConfig": {
                    "responseModalities": ["IMAGE", "TEXT"],
                    "imageConfig": { "aspectRatio": "16:9" }
                }
            })
        );
    }

    #[test]
    fn request_body_omits_image_config_without_sizing() {
        let json = serde_json::to_value(build_request_body(&AiCallRequest::new("x", "m"))).unwrap();
        assert!(json["generationConfig"].get("imageConfig").is_none());
        assert_eq!(json["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn extraction_returns_original_bytes() {
        let payload: Vec<u8> = (0u8..=255).rev().collect();
        let (image, mime) = extract_image(&image_body(&payload, Some("image/jpeg"))).unwrap();
        assert_eq!(image.as_ref(), payload.as_slice());
        assert_eq!(mime, "image/jpeg");
    }

    #[test]
    fn extraction_defaults_mime_type() {
        let (_, mime) = extract_image(&image_body(b"abc", None)).unwrap();
        assert_eq!(mime, DEFAULT_MIME_TYPE);
    }

    #[test]
    fn missing_candidates_is_invalid_response() {
        for body in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"no image"}]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":""}}]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"  "}}]}}]}"#,
            "not json",
        ] {
            let err = extract_image(body).unwrap_err();
            assert!(
                matches!(err, ProviderError::InvalidProviderResponse(_)),
                "{body}: {err:?}"
            );
        }
    }

    #[test]
    fn empty_inline_part_is_skipped_for_a_later_image() {
        let body = format!(
            r#"{{"candidates":[{{"content":{{"parts":[{{"inlineData":{{"data":""}}}},{{"inlineData":{{"mimeType":"image/png","data":"{}"}}}}]}}}}]}}"#,
            STANDARD.encode(b"later")
        );
        let (image, _) = extract_image(&body).unwrap();
        assert_eq!(image.as_ref(), b"later");
    }

    #[test]
    fn quota_hint_sources() {
        let mut headers = HeaderMap::new();
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, &headers, "", 42);
        assert!(matches!(err, ProviderError::QuotaExceeded { retry_after_secs: 42 }));

        let body = r#"{"error":{"code":429,"details":[
            {"@type":"type.googleapis.com/google.rpc.RetryInfo","retryDelay":"16.2s"}]}}"#;
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, &headers, body, 42);
        assert!(matches!(err, ProviderError::QuotaExceeded { retry_after_secs: 17 }));

        headers.insert(RETRY_AFTER, "7".parse().unwrap());
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, &headers, body, 42);
        assert!(matches!(err, ProviderError::QuotaExceeded { retry_after_secs: 7 }));
    }

    #[test]
    fn client_and_server_errors() {
        let body = r#"{"error":{"code":400,"message":"API key not valid"}}"#;
        match classify_failure(StatusCode::BAD_REQUEST, &HeaderMap::new(), body, 1) {
            ProviderError::ClientError {
                status,
                message,
                body: raw,
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
                assert_eq!(raw, body);
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = classify_failure(StatusCode::SERVICE_UNAVAILABLE, &HeaderMap::new(), "", 1);
        assert!(matches!(
            err,
            ProviderError::UpstreamUnavailable { status: Some(503), .. }
        ));
    }

    #[tokio::test]
    async fn successful_call_decodes_image() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/test-model:generateContent")
            .match_header(API_KEY_HEADER, "test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "contents": [{ "parts": [{ "text": "a red bicycle" }] }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(image_body(PNG_MAGIC, Some("image/png")))
            .create_async()
            .await;

        let client = GeminiClient::new(config_for(&server.url())).unwrap();
        let result = client
            .generate_image(AiCallRequest::new("a red bicycle", "test-model"))
            .await
            .unwrap();

        assert_eq!(result.image.as_ref(), PNG_MAGIC);
        assert_eq!(result.mime_type, "image/png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn status_429_is_quota_regardless_of_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/test-model:generateContent")
            .with_status(429)
            .with_body(image_body(PNG_MAGIC, None))
            .create_async()
            .await;

        let client = GeminiClient::new(config_for(&server.url())).unwrap();
        let err = client
            .generate_image(AiCallRequest::new("x", "test-model"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::QuotaExceeded { retry_after_secs: 42 }));
    }

    #[tokio::test]
    async fn status_200_without_candidates_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/test-model:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(config_for(&server.url())).unwrap();
        let err = client
            .generate_image(AiCallRequest::new("x", "test-model"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidProviderResponse(_)));
    }

    #[tokio::test]
    async fn unresponsive_provider_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = GeminiClient::new(GeminiConfig {
            timeout: Duration::from_millis(200),
            ..config_for(&format!("http://{addr}"))
        })
        .unwrap();

        let started = Instant::now();
        let err = client
            .generate_image(AiCallRequest::new("x", "test-model"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = GeminiClient::new(GeminiConfig::default()).unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
    }
}
