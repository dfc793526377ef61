use crate::config::ClientSettings;
use crate::credential::TokenCredential;
use crate::error::{Result, SdkError};
use fluentcloud_common::CloudError;
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

const RETRYABLE_STATUS: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Status, headers and buffered body of a completed request.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Retry-After` in whole seconds; HTTP-date values are ignored.
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as JSON, or `None` when the service sent nothing.
    pub fn json_value(&self) -> Result<Option<serde_json::Value>> {
        if self.body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&self.body)?))
    }

    fn into_error(self, url: &str) -> SdkError {
        let text = String::from_utf8_lossy(&self.body).to_string();
        let parsed = serde_json::from_slice::<CloudError>(&self.body).ok();
        if self.status == 404 {
            let message = parsed
                .map(|e| e.error.message)
                .unwrap_or_else(|| url.to_string());
            return SdkError::NotFound(message);
        }
        match parsed {
            Some(e) => SdkError::Service {
                status: self.status,
                code: e.error.code,
                message: e.error.message,
            },
            None => SdkError::Service {
                status: self.status,
                code: "UnexpectedStatus".to_string(),
                message: text,
            },
        }
    }
}

struct PipelineInner {
    client: Client,
    credential: Arc<dyn TokenCredential>,
    settings: ClientSettings,
}

/// Shared HTTP pipeline: auth header, request id, api-version and retry.
#[derive(Clone)]
pub struct HttpPipeline {
    inner: Arc<PipelineInner>,
}

impl HttpPipeline {
    pub fn new(settings: ClientSettings, credential: Arc<dyn TokenCredential>) -> Result<Self> {
        // Default reqwest client has no overall timeout; a stalled endpoint would hang a poll loop.
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            inner: Arc::new(PipelineInner {
                client,
                credential,
                settings,
            }),
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    /// Absolute URL for a path under the endpoint. Absolute inputs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.inner.settings.endpoint, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T> {
        self.send::<()>(Method::GET, path, Some(api_version), None)
            .await?
            .json()
    }

    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        api_version: Option<&str>,
        body: Option<&B>,
    ) -> Result<RawResponse> {
        let url = with_api_version(&self.url(path), api_version);
        let settings = &self.inner.settings;
        let mut attempt: u32 = 0;

        loop {
            let token = self.inner.credential.get_token().await?;
            let mut request = self
                .inner
                .client
                .request(method.clone(), &url)
                .bearer_auth(&token.token)
                .header(CLIENT_REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string())
                .header(CONTENT_TYPE, "application/json");
            if let Some(b) = body {
                request = request.json(b);
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let headers = resp.headers().clone();
                    let bytes = resp.bytes().await?;
                    let raw = RawResponse {
                        status,
                        headers,
                        body: bytes.to_vec(),
                    };
                    debug!("[pipeline] {} {} -> {}", method, url, status);

                    if RETRYABLE_STATUS.contains(&status) && attempt < settings.max_retries {
                        let delay = raw
                            .retry_after()
                            .unwrap_or_else(|| backoff(settings.retry_delay, attempt));
                        warn!(
                            "[pipeline] {} {} returned {}, retry {}/{} in {:?}",
                            method,
                            url,
                            status,
                            attempt + 1,
                            settings.max_retries,
                            delay
                        );
                        sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if (200..300).contains(&status) {
                        return Ok(raw);
                    }
                    return Err(raw.into_error(&url));
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < settings.max_retries => {
                    let delay = backoff(settings.retry_delay, attempt);
                    warn!(
                        "[pipeline] {} {} failed ({}), retry {}/{} in {:?}",
                        method,
                        url,
                        e,
                        attempt + 1,
                        settings.max_retries,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(6))
}

fn with_api_version(url: &str, api_version: Option<&str>) -> String {
    match api_version {
        Some(v) if !url.contains("api-version=") => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{}{}api-version={}", url, sep, urlencoding::encode(v))
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_version_is_appended_once() {
        assert_eq!(
            with_api_version("http://h/a", Some("2024-03-01")),
            "http://h/a?api-version=2024-03-01"
        );
        assert_eq!(
            with_api_version("http://h/a?$skipToken=2", Some("2024-03-01")),
            "http://h/a?$skipToken=2&api-version=2024-03-01"
        );
        assert_eq!(
            with_api_version("http://h/a?api-version=1", Some("2")),
            "http://h/a?api-version=1"
        );
        assert_eq!(with_api_version("http://h/a", None), "http://h/a");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff(base, 0), Duration::from_millis(100));
        assert_eq!(backoff(base, 2), Duration::from_millis(400));
        assert_eq!(backoff(base, 20), Duration::from_millis(6400));
    }

    #[test]
    fn error_mapping_reads_cloud_error() {
        let raw = RawResponse {
            status: 409,
            headers: HeaderMap::new(),
            body: br#"{"error":{"code":"Conflict","message":"busy"}}"#.to_vec(),
        };
        match raw.into_error("http://h/x") {
            SdkError::Service { status, code, message } => {
                assert_eq!(status, 409);
                assert_eq!(code, "Conflict");
                assert_eq!(message, "busy");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let missing = RawResponse {
            status: 404,
            headers: HeaderMap::new(),
            body: Vec::new(),
        };
        assert!(missing.into_error("http://h/x").is_not_found());
    }
}
