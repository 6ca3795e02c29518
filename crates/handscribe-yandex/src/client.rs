//! Yandex Vision OCR HTTP client.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use handscribe_core::{
    CancellationToken, DiagnosticDump, Error, RecognitionResult, Recognizer, Result,
};
use handscribe_reqwest::{Egress, HttpConfig, build_client, read_body, send};
use reqwest::{Client, StatusCode};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::wire::{RecognizeRequest, RecognizeResponse};
use crate::{TRACING_TARGET_CLIENT, YandexConfig};

struct YandexOcrClientInner {
    http: Client,
    config: YandexConfig,
    dump: DiagnosticDump,
}

/// HTTP client for the Yandex Vision `recognizeText` endpoint.
///
/// Makes exactly one request per [`recognize`] call. Retrying is left to
/// the caller.
///
/// [`recognize`]: YandexOcrClient::recognize
#[derive(Clone)]
pub struct YandexOcrClient {
    inner: Arc<YandexOcrClientInner>,
}

impl std::fmt::Debug for YandexOcrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YandexOcrClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl YandexOcrClient {
    /// Creates a new client. OCR traffic always goes out directly.
    pub fn new(config: YandexConfig, http: &HttpConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(http, &Egress::Direct)?;
        Ok(Self::with_http_client(config, client))
    }

    /// Creates a client around an existing `reqwest` client.
    pub fn with_http_client(config: YandexConfig, http: Client) -> Self {
        let dump = config.dump();

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            url = %config.ocr_url,
            model = %config.model,
            languages = ?config.language_codes,
            "Yandex OCR client initialized"
        );

        Self {
            inner: Arc::new(YandexOcrClientInner { http, config, dump }),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &YandexConfig {
        &self.inner.config
    }

    /// Recognizes handwritten text in the image at `image_path`.
    pub async fn recognize(
        &self,
        image_path: &Path,
        folder_id: &str,
        auth_token: &str,
        cancel: &CancellationToken,
    ) -> Result<RecognitionResult> {
        if folder_id.trim().is_empty() {
            return Err(Error::auth_or_config().with_message("folder ID is not set"));
        }
        if auth_token.trim().is_empty() {
            return Err(Error::auth_or_config().with_message("IAM token is not set"));
        }

        let image = read_image(image_path).await?;
        let start = Instant::now();

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            path = %image_path.display(),
            size = image.len(),
            "Recognizing image"
        );

        let text = self.send_image(&image, folder_id, auth_token, cancel).await?;
        let elapsed = start.elapsed();

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            chars = text.chars().count(),
            elapsed_ms = elapsed.as_millis(),
            "Recognition finished"
        );

        Ok(RecognitionResult::new(text, elapsed))
    }

    async fn send_image(
        &self,
        image: &[u8],
        folder_id: &str,
        auth_token: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let config = &self.inner.config;
        let body = RecognizeRequest {
            mime_type: &config.mime_type,
            language_codes: &config.language_codes,
            model: config.model.as_ref(),
            content: STANDARD.encode(image),
        };

        let request = self
            .inner
            .http
            .post(config.ocr_url.clone())
            .header(AUTHORIZATION, format!("Bearer {auth_token}"))
            .header(CONTENT_TYPE, "application/json")
            .header("x-folder-id", folder_id)
            .header("x-data-logging-enabled", "true")
            .json(&body);

        let response = send(request, "OCR request", cancel).await?;
        let (status, body) = read_body(response, "OCR response", cancel).await?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            status = status.as_u16(),
            size = body.len(),
            "Received OCR response"
        );

        if status != StatusCode::OK {
            return Err(Error::remote_service()
                .with_status(status.as_u16())
                .with_message(format!(
                    "OCR failed: status {}, body: {}",
                    status.as_u16(),
                    String::from_utf8_lossy(&body)
                )));
        }

        self.inner.dump.write(&body).await?;

        let parsed: RecognizeResponse = serde_json::from_slice(&body).map_err(|e| {
            Error::parse()
                .with_message("failed to decode OCR response")
                .with_source(e)
        })?;

        if let Some(error) = parsed.error_message() {
            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                code = %error.code,
                message = %error.message,
                "OCR service reported an error"
            );
            return Err(Error::remote_service()
                .with_status(status.as_u16())
                .with_message(format!("OCR error: {}", error.message)));
        }

        let text = parsed.text();
        if text.is_empty() {
            return Err(Error::empty_result().with_message("no text detected"));
        }

        Ok(text)
    }
}

/// Reads the whole image, rejecting missing and empty files.
async fn read_image(path: &Path) -> Result<Vec<u8>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        Error::file_access()
            .with_message(format!("failed to read image '{}'", path.display()))
            .with_source(e)
    })?;

    if bytes.is_empty() {
        return Err(Error::file_access().with_message(format!("image '{}' is empty", path.display())));
    }

    Ok(bytes)
}

#[async_trait::async_trait]
impl Recognizer for YandexOcrClient {
    async fn recognize(
        &self,
        image_path: &Path,
        folder_id: &str,
        auth_token: &str,
        cancel: &CancellationToken,
    ) -> Result<RecognitionResult> {
        YandexOcrClient::recognize(self, image_path, folder_id, auth_token, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use handscribe_core::ErrorKind;
    use url::Url;

    use super::*;

    struct Server {
        url: Url,
        hits: Arc<AtomicU32>,
    }

    /// Serves `body` with `status` for every request and counts hits.
    async fn spawn_server(status: StatusCode, body: &'static str) -> Server {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/ocr/v1/recognizeText",
            post(move |headers: HeaderMap, payload: String| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(headers["authorization"], "Bearer iam-token");
                    assert_eq!(headers["x-folder-id"], "folder-1");
                    assert_eq!(headers["x-data-logging-enabled"], "true");
                    let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
                    assert_eq!(json["model"], "handwritten");
                    assert_eq!(json["languageCodes"], serde_json::json!(["ru"]));
                    (status, body)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Server {
            url: Url::parse(&format!("http://{addr}/ocr/v1/recognizeText")).unwrap(),
            hits,
        }
    }

    fn client(url: Url, dump_dir: &Path) -> YandexOcrClient {
        let config = YandexConfig::default()
            .with_ocr_url(url)
            .with_dump_path(Some(dump_dir.join("api_response.json")));
        YandexOcrClient::new(config, &HttpConfig::new(5)).unwrap()
    }

    fn image(dir: &Path, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join("photo.jpg");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_recognize_returns_full_text() {
        let server = spawn_server(
            StatusCode::OK,
            r#"{"result":{"textAnnotation":{"fullText":" Привет, мир \n"}}}"#,
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(server.url, dir.path());

        let result = client
            .recognize(
                &image(dir.path(), b"\xff\xd8jpeg"),
                "folder-1",
                "iam-token",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.text, "Привет, мир");
        assert_eq!(server.hits.load(Ordering::SeqCst), 1);
        let dump = std::fs::read_to_string(dir.path().join("api_response.json")).unwrap();
        assert!(dump.contains("fullText"));
    }

    #[tokio::test]
    async fn test_empty_image_fails_before_network() {
        let server = spawn_server(StatusCode::OK, "{}").await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(server.url, dir.path());

        let error = client
            .recognize(
                &image(dir.path(), b""),
                "folder-1",
                "iam-token",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::FileAccess);
        assert_eq!(server.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_image_fails_with_file_access() {
        let server = spawn_server(StatusCode::OK, "{}").await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(server.url, dir.path());

        let error = client
            .recognize(
                &dir.path().join("absent.jpg"),
                "folder-1",
                "iam-token",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::FileAccess);
        assert_eq!(server.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_credentials_rejected() {
        let server = spawn_server(StatusCode::OK, "{}").await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(server.url, dir.path());
        let path = image(dir.path(), b"jpeg");

        let error = client
            .recognize(&path, "", "iam-token", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AuthOrConfig);

        let error = client
            .recognize(&path, "folder-1", " ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AuthOrConfig);
        assert_eq!(server.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_success_status_is_remote_service() {
        let server = spawn_server(StatusCode::UNAUTHORIZED, "bad token").await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(server.url, dir.path());

        let error = client
            .recognize(
                &image(dir.path(), b"jpeg"),
                "folder-1",
                "iam-token",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::RemoteService);
        assert_eq!(error.status(), Some(401));
        assert!(error.message().unwrap().contains("bad token"));
        assert_eq!(server.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_accepted_status_is_remote_service() {
        let server = spawn_server(
            StatusCode::ACCEPTED,
            r#"{"result":{"textAnnotation":{"fullText":"текст"}}}"#,
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(server.url, dir.path());

        let error = client
            .recognize(
                &image(dir.path(), b"jpeg"),
                "folder-1",
                "iam-token",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::RemoteService);
        assert_eq!(error.status(), Some(202));
    }

    #[tokio::test]
    async fn test_embedded_error_is_remote_service() {
        let server =
            spawn_server(StatusCode::OK, r#"{"error":{"message":"quota exceeded"}}"#).await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(server.url, dir.path());

        let error = client
            .recognize(
                &image(dir.path(), b"jpeg"),
                "folder-1",
                "iam-token",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::RemoteService);
        assert!(error.message().unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_blank_text_is_empty_result() {
        let server = spawn_server(
            StatusCode::OK,
            r#"{"result":{"textAnnotation":{"fullText":"   ","blocks":[]}}}"#,
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(server.url, dir.path());

        let error = client
            .recognize(
                &image(dir.path(), b"jpeg"),
                "folder-1",
                "iam-token",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::EmptyResult);
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = spawn_server(StatusCode::OK, "<html>oops</html>").await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(server.url, dir.path());

        let error = client
            .recognize(
                &image(dir.path(), b"jpeg"),
                "folder-1",
                "iam-token",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_required_dump_failure_is_fatal() {
        let server = spawn_server(
            StatusCode::OK,
            r#"{"result":{"textAnnotation":{"fullText":"текст"}}}"#,
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let config = YandexConfig::default()
            .with_ocr_url(server.url)
            .with_dump_path(Some(dir.path().join("missing").join("api_response.json")));

        let best_effort = YandexOcrClient::new(config.clone(), &HttpConfig::new(5)).unwrap();
        let path = image(dir.path(), b"jpeg");
        let result = best_effort
            .recognize(&path, "folder-1", "iam-token", &CancellationToken::new())
            .await;
        assert_eq!(result.unwrap().text, "текст");

        let strict =
            YandexOcrClient::new(config.with_required_dump(true), &HttpConfig::new(5)).unwrap();
        let error = strict
            .recognize(&path, "folder-1", "iam-token", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::FileAccess);
    }

    #[tokio::test]
    async fn test_cancelled_call_returns_cancelled() {
        let server = spawn_server(StatusCode::OK, "{}").await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(server.url, dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = client
            .recognize(&image(dir.path(), b"jpeg"), "folder-1", "iam-token", &cancel)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Cancelled);
    }
}
