//! reqwest-backed [`RequestExecutor`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{
    BINARY_CONTENT_TYPES, CONNECT_TIMEOUT_SECS, MISSING_LOCATOR_REASON, REQUEST_TIMEOUT_SECS,
};
use super::error::{ErrorDetail, ExecutorError};
use super::{GenerationOutcome, RequestExecutor};
use crate::artifact::filename::parse_content_disposition;
use crate::request::GenerationRequest;

/// Executes generation requests over HTTP.
///
/// Cheap to clone; clones share the connection pool. The same client is
/// handed to the save target so remote artifacts are fetched through it.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    endpoint: Url,
}

impl HttpExecutor {
    /// Creates an executor for `endpoint` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidEndpoint`] when `endpoint` is not an
    /// absolute http(s) URL, or [`ExecutorError::Client`] when the HTTP
    /// client cannot be built.
    pub fn new(endpoint: &str) -> Result<Self, ExecutorError> {
        Self::with_timeouts(endpoint, CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS)
    }

    /// Creates an executor with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_timeouts(
        endpoint: &str,
        connect_timeout_secs: u64,
        request_timeout_secs: u64,
    ) -> Result<Self, ExecutorError> {
        let endpoint = parse_endpoint(endpoint)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(request_timeout_secs))
            .gzip(true)
            .user_agent(concat!("deckgen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ExecutorError::Client { source })?;
        debug!(endpoint = %endpoint, "HTTP executor ready");
        Ok(Self { client, endpoint })
    }

    /// The generation endpoint. Relative download locators resolve against it.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    #[instrument(skip(self, request), fields(endpoint = %self.endpoint))]
    async fn execute(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, ExecutorError> {
        debug!(
            text_len = request.text().len(),
            tone = ?request.tone(),
            slides = ?request.slide_count(),
            "sending generation request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request.to_body())
            .send()
            .await
            .map_err(|e| ExecutorError::network(self.endpoint.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            // An unreadable error body falls back to the status text.
            let body = response.bytes().await.unwrap_or_default();
            let detail = parse_error_detail(&body);
            warn!(status = status.as_u16(), ?detail, "generation request rejected");
            return Err(ExecutorError::server(status.as_u16(), detail));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match classify_body(content_type.as_deref()) {
            BodyKind::Json => {
                let body = read_body(response, self.endpoint.as_str()).await?;
                let locator = parse_success_body(&body)?;
                info!(locator = %locator, "generation succeeded with remote artifact");
                Ok(GenerationOutcome::Remote { locator })
            }
            BodyKind::Binary => {
                let filename = response
                    .headers()
                    .get(CONTENT_DISPOSITION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_content_disposition);
                let bytes = read_body(response, self.endpoint.as_str()).await?;
                if bytes.is_empty() {
                    warn!("generation succeeded but returned an empty file");
                    return Err(ExecutorError::EmptyResult);
                }
                info!(bytes = bytes.len(), "generation succeeded with binary artifact");
                Ok(GenerationOutcome::Binary {
                    bytes,
                    content_type,
                    filename,
                })
            }
            BodyKind::Unsupported(mime) => Err(ExecutorError::parse(format!(
                "unsupported content type '{mime}' in success response"
            ))),
        }
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ExecutorError> {
    let parsed = Url::parse(endpoint.trim())
        .map_err(|_| ExecutorError::invalid_endpoint(endpoint.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ExecutorError::invalid_endpoint(endpoint.to_string()));
    }
    Ok(parsed)
}

#[derive(Debug, PartialEq, Eq)]
enum BodyKind {
    Json,
    Binary,
    Unsupported(String),
}

/// Missing content types are treated as binary, per HTTP's octet-stream default.
fn classify_body(content_type: Option<&str>) -> BodyKind {
    let Some(content_type) = content_type else {
        return BodyKind::Binary;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        BodyKind::Json
    } else if mime.is_empty() || BINARY_CONTENT_TYPES.contains(&mime.as_str()) {
        BodyKind::Binary
    } else {
        BodyKind::Unsupported(mime)
    }
}

/// Buffers the whole body; an interrupted stream is a network error.
async fn read_body(response: reqwest::Response, endpoint: &str) -> Result<Vec<u8>, ExecutorError> {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ExecutorError::network(endpoint, e))?;
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct SuccessBody {
    #[serde(default)]
    download_url: Option<String>,
}

fn parse_success_body(body: &[u8]) -> Result<String, ExecutorError> {
    let parsed: SuccessBody = serde_json::from_slice(body)
        .map_err(|e| ExecutorError::parse(format!("invalid JSON in success response: {e}")))?;
    parsed
        .download_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ExecutorError::parse(MISSING_LOCATOR_REASON))
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<DetailField>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetailField {
    Text(String),
    Items(Vec<DetailItem>),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct DetailItem {
    #[serde(default)]
    msg: Option<String>,
}

/// Reads `{detail: string | [{msg}]}` or `{message}` from an error body.
///
/// A blank `detail` string counts as absent and falls through to `message`.
/// Any other unusable `detail` does not; the caller then falls back to the
/// status text.
fn parse_error_detail(body: &[u8]) -> Option<ErrorDetail> {
    if body.is_empty() {
        return None;
    }
    let parsed: ErrorBody = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "error body is not structured JSON");
            return None;
        }
    };

    let non_empty = |value: String| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    match parsed.detail {
        Some(DetailField::Items(items)) => items
            .into_iter()
            .next()
            .and_then(|item| item.msg)
            .and_then(non_empty)
            .map(ErrorDetail::Field),
        Some(DetailField::Text(text)) if !text.trim().is_empty() => {
            Some(ErrorDetail::Message(text.trim().to_string()))
        }
        Some(DetailField::Other(_)) => None,
        Some(DetailField::Text(_)) | None => {
            parsed.message.and_then(non_empty).map(ErrorDetail::Message)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::executor::PRESENTATION_CONTENT_TYPE;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn executor_for(server: &wiremock::MockServer) -> HttpExecutor {
        HttpExecutor::new(&format!("{}/generate-ppt/", server.uri())).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let result = HttpExecutor::new("not-a-url");
        assert!(matches!(result, Err(ExecutorError::InvalidEndpoint { .. })));

        let result = HttpExecutor::new("ftp://example.com/generate");
        assert!(matches!(result, Err(ExecutorError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_classify_body() {
        assert_eq!(classify_body(Some("application/json")), BodyKind::Json);
        assert_eq!(
            classify_body(Some("application/json; charset=utf-8")),
            BodyKind::Json
        );
        assert_eq!(
            classify_body(Some("application/problem+json")),
            BodyKind::Json
        );
        assert_eq!(
            classify_body(Some(PRESENTATION_CONTENT_TYPE)),
            BodyKind::Binary
        );
        assert_eq!(
            classify_body(Some("Application/Octet-Stream")),
            BodyKind::Binary
        );
        assert_eq!(classify_body(None), BodyKind::Binary);
        assert_eq!(
            classify_body(Some("text/html; charset=utf-8")),
            BodyKind::Unsupported("text/html".to_string())
        );
    }

    #[test]
    fn test_parse_error_detail_string() {
        let detail = parse_error_detail(br#"{"detail": "model timeout"}"#);
        assert_eq!(detail, Some(ErrorDetail::Message("model timeout".to_string())));
    }

    #[test]
    fn test_parse_error_detail_field_list_takes_first_msg() {
        let body = br#"{"detail": [{"loc": ["body", "text_input"], "msg": "field required"}, {"msg": "second"}]}"#;
        assert_eq!(
            parse_error_detail(body),
            Some(ErrorDetail::Field("field required".to_string()))
        );
    }

    #[test]
    fn test_parse_error_detail_message_key() {
        assert_eq!(
            parse_error_detail(br#"{"message": "quota exceeded"}"#),
            Some(ErrorDetail::Message("quota exceeded".to_string()))
        );
    }

    #[test]
    fn test_parse_error_detail_unusable_detail_does_not_use_message() {
        assert_eq!(
            parse_error_detail(br#"{"detail": {"code": 7}, "message": "ignored"}"#),
            None
        );
        assert_eq!(parse_error_detail(br#"{"detail": []}"#), None);
    }

    #[test]
    fn test_parse_error_detail_blank_detail_uses_message() {
        assert_eq!(
            parse_error_detail(br#"{"detail": "", "message": "quota exceeded"}"#),
            Some(ErrorDetail::Message("quota exceeded".to_string()))
        );
        assert_eq!(
            parse_error_detail(br#"{"detail": "  ", "message": "quota exceeded"}"#),
            Some(ErrorDetail::Message("quota exceeded".to_string()))
        );
    }

    #[test]
    fn test_parse_error_detail_not_json() {
        assert_eq!(parse_error_detail(b"<html>Bad Gateway</html>"), None);
        assert_eq!(parse_error_detail(b""), None);
        assert_eq!(parse_error_detail(br#"{"detail": "   "}"#), None);
    }

    #[test]
    fn test_parse_success_body_missing_locator() {
        let result = parse_success_body(br#"{"message": "ok"}"#);
        match result {
            Err(ExecutorError::Parse { reason }) => assert_eq!(reason, MISSING_LOCATOR_REASON),
            other => panic!("Expected Parse error, got: {other:?}"),
        }
        assert!(parse_success_body(br#"{"download_url": ""}"#).is_err());
        assert!(parse_success_body(b"not json").is_err());
    }

    #[tokio::test]
    async fn test_execute_json_success_returns_remote_locator() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("POST"))
            .and(path("/generate-ppt/"))
            .and(body_json(serde_json::json!({
                "text_input": "Quantum Computing",
                "num_slides": 5,
                "tone": "educational"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "download_url": "/files/abc.pptx" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let executor = executor_for(&mock_server);
        let request = GenerationRequest::new("Quantum Computing").with_tone("educational");
        let outcome = executor.execute(&request).await.unwrap();

        assert_eq!(
            outcome,
            GenerationOutcome::Remote {
                locator: "/files/abc.pptx".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_execute_binary_success_returns_bytes_and_filename() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("POST"))
            .and(path("/generate-ppt/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "Content-Disposition",
                        r#"attachment; filename="deck.pptx""#,
                    )
                    .set_body_raw(b"PK\x03\x04slides".to_vec(), PRESENTATION_CONTENT_TYPE),
            )
            .mount(&mock_server)
            .await;

        let executor = executor_for(&mock_server);
        let outcome = executor
            .execute(&GenerationRequest::new("topic"))
            .await
            .unwrap();

        match outcome {
            GenerationOutcome::Binary {
                bytes,
                content_type,
                filename,
            } => {
                assert_eq!(bytes, b"PK\x03\x04slides");
                assert_eq!(content_type.as_deref(), Some(PRESENTATION_CONTENT_TYPE));
                assert_eq!(filename.as_deref(), Some("deck.pptx"));
            }
            other => panic!("Expected Binary outcome, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_zero_length_binary_is_empty_result() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("POST"))
            .and(path("/generate-ppt/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(Vec::new(), PRESENTATION_CONTENT_TYPE),
            )
            .mount(&mock_server)
            .await;

        let executor = executor_for(&mock_server);
        let result = executor.execute(&GenerationRequest::new("topic")).await;

        assert!(matches!(result, Err(ExecutorError::EmptyResult)));
    }

    #[tokio::test]
    async fn test_execute_500_with_detail() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("POST"))
            .and(path("/generate-ppt/"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({ "detail": "model timeout" })),
            )
            .mount(&mock_server)
            .await;

        let executor = executor_for(&mock_server);
        let result = executor.execute(&GenerationRequest::new("topic")).await;

        match result {
            Err(ExecutorError::Server { status, detail, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(detail, Some(ErrorDetail::Message("model timeout".to_string())));
            }
            other => panic!("Expected Server error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_502_without_body_keeps_status_text() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("POST"))
            .and(path("/generate-ppt/"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&mock_server)
            .await;

        let executor = executor_for(&mock_server);
        let result = executor.execute(&GenerationRequest::new("topic")).await;

        match result {
            Err(ExecutorError::Server {
                status,
                status_text,
                detail,
            }) => {
                assert_eq!(status, 502);
                assert_eq!(status_text.as_deref(), Some("Bad Gateway"));
                assert!(detail.is_none());
            }
            other => panic!("Expected Server error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_json_without_locator_is_parse_error() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("POST"))
            .and(path("/generate-ppt/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "message": "PPT generated" })),
            )
            .mount(&mock_server)
            .await;

        let executor = executor_for(&mock_server);
        let result = executor.execute(&GenerationRequest::new("topic")).await;

        assert!(matches!(result, Err(ExecutorError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_execute_html_success_is_parse_error() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("POST"))
            .and(path("/generate-ppt/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"<html>login</html>".to_vec(), "text/html"),
            )
            .mount(&mock_server)
            .await;

        let executor = executor_for(&mock_server);
        let result = executor.execute(&GenerationRequest::new("topic")).await;

        match result {
            Err(ExecutorError::Parse { reason }) => {
                assert!(reason.contains("text/html"), "Expected mime in: {reason}");
            }
            other => panic!("Expected Parse error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_sends_json_content_type() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("POST"))
            .and(path("/generate-ppt/"))
            .and(header("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "download_url": "/files/x.pptx" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let executor = executor_for(&mock_server);
        assert!(executor.execute(&GenerationRequest::new("topic")).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_connection_refused_is_network_error() {
        // Bind then drop a listener so the port is known to be closed.
        let Ok(listener) = std::net::TcpListener::bind("127.0.0.1:0") else {
            return;
        };
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let executor = HttpExecutor::new(&format!("http://{addr}/generate-ppt/")).unwrap();
        let result = executor.execute(&GenerationRequest::new("topic")).await;

        assert!(
            matches!(result, Err(ExecutorError::Network { .. })),
            "Expected Network error, got: {result:?}"
        );
    }
}
