use crate::error::{Result, SdkError};
use crate::pipeline::{HttpPipeline, RawResponse};
use fluentcloud_common::{OperationState, OperationStatus};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::time::sleep;
use tracing::{debug, info};

pub const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
pub const LOCATION_HEADER: &str = "location";

/// Observable progress of a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl PollStatus {
    pub fn is_done(&self) -> bool {
        !matches!(self, PollStatus::InProgress)
    }
}

#[derive(Debug, Clone)]
enum Monitor {
    /// Operation-status resource with a `status` field.
    AsyncOperation(String),
    /// 202 while running, 200/204 when done.
    Location(String),
    /// No monitor header: re-read the resource until `provisioningState` is terminal.
    ResourceState(String),
}

#[derive(Debug)]
enum PollerState {
    InProgress(Monitor),
    Succeeded(Option<Value>),
    Failed {
        status: PollStatus,
        code: String,
        message: String,
    },
}

type Finish<T> = Box<dyn FnOnce(Option<Value>) -> Result<T> + Send>;

/// Tracks one long-running operation until it reaches a terminal state.
///
/// Drive it step by step with [`Poller::poll`], to completion with
/// [`Poller::until_done`], or from synchronous code with [`Poller::wait_blocking`].
pub struct Poller<T> {
    pipeline: HttpPipeline,
    api_version: String,
    final_url: Option<String>,
    state: PollerState,
    delay: Duration,
    attempts: u32,
    finish: Finish<T>,
}

impl<T: DeserializeOwned + 'static> Poller<T> {
    /// Poller whose final body is deserialized into `T` (`()` for operations without a result).
    pub fn new(
        pipeline: HttpPipeline,
        api_version: &str,
        initial: RawResponse,
        final_url: Option<String>,
    ) -> Result<Self> {
        Poller::with_finish(
            pipeline,
            api_version,
            initial,
            final_url,
            Box::new(|body| Ok(serde_json::from_value(body.unwrap_or(Value::Null))?)),
        )
    }
}

impl Poller<()> {
    /// Poller for operations whose final body, if any, is ignored (DELETE, POST actions).
    pub fn discarding(
        pipeline: HttpPipeline,
        api_version: &str,
        initial: RawResponse,
    ) -> Result<Self> {
        Poller::with_finish(pipeline, api_version, initial, None, Box::new(|_| Ok(())))
    }
}

impl<T: 'static> Poller<T> {
    fn with_finish(
        pipeline: HttpPipeline,
        api_version: &str,
        initial: RawResponse,
        final_url: Option<String>,
        finish: Finish<T>,
    ) -> Result<Self> {
        let delay = initial
            .retry_after()
            .unwrap_or(pipeline.settings().poll_interval);
        let state = initial_state(&initial, final_url.as_deref())?;
        debug!("[poller] started: status={} state={:?}", initial.status, state);
        Ok(Poller {
            pipeline,
            api_version: api_version.to_string(),
            final_url,
            state,
            delay,
            attempts: 0,
            finish,
        })
    }

    /// Transforms the final value once the operation succeeds.
    pub fn map<U, F>(self, f: F) -> Poller<U>
    where
        U: 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        let finish = self.finish;
        Poller {
            pipeline: self.pipeline,
            api_version: self.api_version,
            final_url: self.final_url,
            state: self.state,
            delay: self.delay,
            attempts: self.attempts,
            finish: Box::new(move |body| finish(body).and_then(f)),
        }
    }

    pub fn status(&self) -> PollStatus {
        match &self.state {
            PollerState::InProgress(_) => PollStatus::InProgress,
            PollerState::Succeeded(_) => PollStatus::Succeeded,
            PollerState::Failed { status, .. } => *status,
        }
    }

    /// Number of status reads issued so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay the service asked for before the next status read.
    pub fn next_delay(&self) -> Duration {
        self.delay
    }

    /// Issues a single status read. Terminal states are sticky.
    pub async fn poll(&mut self) -> Result<PollStatus> {
        let monitor = match &self.state {
            PollerState::InProgress(m) => m.clone(),
            _ => return Ok(self.status()),
        };

        let max = self.pipeline.settings().max_poll_attempts;
        if self.attempts >= max {
            return Err(SdkError::PollTimeout {
                attempts: self.attempts,
            });
        }
        self.attempts += 1;

        match monitor {
            Monitor::AsyncOperation(url) => {
                let resp = self.read(&url).await?;
                let op: OperationStatus = resp.json()?;
                match op.status {
                    OperationState::InProgress => {}
                    OperationState::Succeeded => {
                        let body = match self.final_url.clone() {
                            Some(final_url) => self.read(&final_url).await?.json_value()?,
                            None => None,
                        };
                        self.state = PollerState::Succeeded(body);
                    }
                    OperationState::Failed | OperationState::Canceled => {
                        let status = if op.status == OperationState::Failed {
                            PollStatus::Failed
                        } else {
                            PollStatus::Canceled
                        };
                        let (code, message) = op
                            .error
                            .map(|e| (e.code, e.message))
                            .unwrap_or_else(|| (format!("{:?}", op.status), op.name.clone()));
                        self.state = PollerState::Failed {
                            status,
                            code,
                            message,
                        };
                    }
                }
            }
            Monitor::Location(url) => match self.read(&url).await {
                Ok(resp) => {
                    if resp.status != 202 {
                        self.state = PollerState::Succeeded(resp.json_value()?);
                    }
                }
                // The monitor answers with the operation's error once it has failed.
                Err(SdkError::Service {
                    status,
                    code,
                    message,
                }) if is_operation_failure(status) => {
                    self.state = PollerState::Failed {
                        status: PollStatus::Failed,
                        code,
                        message,
                    };
                }
                Err(e) => return Err(e),
            },
            Monitor::ResourceState(url) => {
                let resp = self.read(&url).await?;
                let body = resp.json_value()?;
                self.state = state_from_body(body, Monitor::ResourceState(url));
            }
        }

        let status = self.status();
        if status.is_done() {
            info!(
                "[poller] operation finished: {:?} after {} polls",
                status, self.attempts
            );
        }
        Ok(status)
    }

    /// Polls with the service-provided delay until the operation is terminal.
    pub async fn until_done(mut self) -> Result<T> {
        while !self.status().is_done() {
            sleep(self.delay).await;
            self.poll().await?;
        }
        self.into_result()
    }

    /// Synchronous variant of [`Poller::until_done`].
    ///
    /// Inside a tokio runtime this must be the multi-threaded flavor; outside of one a
    /// private current-thread runtime is used.
    pub fn wait_blocking(self) -> Result<T> {
        match Handle::try_current() {
            Ok(handle) => {
                if handle.runtime_flavor() != RuntimeFlavor::MultiThread {
                    return Err(SdkError::InvalidArgument(
                        "wait_blocking needs a multi-threaded tokio runtime".to_string(),
                    ));
                }
                tokio::task::block_in_place(move || handle.block_on(self.until_done()))
            }
            Err(_) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| SdkError::Config(format!("cannot start runtime: {}", e)))?;
                runtime.block_on(self.until_done())
            }
        }
    }

    fn into_result(self) -> Result<T> {
        match self.state {
            PollerState::Succeeded(body) => (self.finish)(body),
            PollerState::Failed { code, message, .. } => {
                Err(SdkError::OperationFailed { code, message })
            }
            PollerState::InProgress(_) => Err(SdkError::InvalidArgument(
                "operation is still in progress".to_string(),
            )),
        }
    }

    async fn read(&mut self, url: &str) -> Result<RawResponse> {
        let resp = self
            .pipeline
            .send::<()>(Method::GET, url, Some(&self.api_version), None)
            .await?;
        if let Some(delay) = resp.retry_after() {
            self.delay = delay;
        }
        Ok(resp)
    }
}

fn initial_state(initial: &RawResponse, final_url: Option<&str>) -> Result<PollerState> {
    if let Some(url) = initial.header(ASYNC_OPERATION_HEADER) {
        return Ok(PollerState::InProgress(Monitor::AsyncOperation(url.to_string())));
    }
    if initial.status == 202 {
        if let Some(url) = initial.header(LOCATION_HEADER) {
            return Ok(PollerState::InProgress(Monitor::Location(url.to_string())));
        }
    }
    let body = initial.json_value()?;
    Ok(match final_url {
        Some(url) => state_from_body(body, Monitor::ResourceState(url.to_string())),
        None => PollerState::Succeeded(body),
    })
}

/// Statuses that describe the operation itself rather than the status request.
fn is_operation_failure(status: u16) -> bool {
    status >= 400 && !matches!(status, 401 | 403 | 408 | 429)
}

fn state_from_body(body: Option<Value>, monitor: Monitor) -> PollerState {
    let state = body
        .as_ref()
        .and_then(|b| b.pointer("/properties/provisioningState"))
        .and_then(|s| s.as_str())
        .map(|s| s.to_string());
    match state.as_deref() {
        None | Some("Succeeded") => PollerState::Succeeded(body),
        Some("Failed") => PollerState::Failed {
            status: PollStatus::Failed,
            code: "ProvisioningFailed".to_string(),
            message: "resource reached provisioning state Failed".to_string(),
        },
        Some("Canceled") => PollerState::Failed {
            status: PollStatus::Canceled,
            code: "Canceled".to_string(),
            message: "resource reached provisioning state Canceled".to_string(),
        },
        Some(_) => PollerState::InProgress(monitor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn response(status: u16, headers: &[(&'static str, &str)], body: &str) -> RawResponse {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        RawResponse {
            status,
            headers: map,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn async_operation_header_wins() {
        let r = response(
            201,
            &[("azure-asyncoperation", "http://h/op/1"), ("location", "http://h/l/1")],
            r#"{"properties":{"provisioningState":"Creating"}}"#,
        );
        assert!(matches!(
            initial_state(&r, Some("http://h/res")).unwrap(),
            PollerState::InProgress(Monitor::AsyncOperation(u)) if u == "http://h/op/1"
        ));
    }

    #[test]
    fn location_header_only_counts_on_accepted() {
        let r = response(202, &[("location", "http://h/l/1")], "");
        assert!(matches!(
            initial_state(&r, None).unwrap(),
            PollerState::InProgress(Monitor::Location(_))
        ));
        let done = response(200, &[("location", "http://h/l/1")], "");
        assert!(matches!(
            initial_state(&done, None).unwrap(),
            PollerState::Succeeded(None)
        ));
    }

    #[test]
    fn location_failures_exclude_request_errors() {
        assert!(is_operation_failure(409));
        assert!(is_operation_failure(500));
        assert!(!is_operation_failure(401));
        assert!(!is_operation_failure(429));
        assert!(!is_operation_failure(202));
    }

    #[test]
    fn body_state_without_headers() {
        let creating = response(201, &[], r#"{"properties":{"provisioningState":"Creating"}}"#);
        assert!(matches!(
            initial_state(&creating, Some("http://h/res")).unwrap(),
            PollerState::InProgress(Monitor::ResourceState(_))
        ));
        let failed = response(200, &[], r#"{"properties":{"provisioningState":"Failed"}}"#);
        assert!(matches!(
            initial_state(&failed, Some("http://h/res")).unwrap(),
            PollerState::Failed { status: PollStatus::Failed, .. }
        ));
        let ok = response(200, &[], r#"{"properties":{"provisioningState":"Succeeded"}}"#);
        assert!(matches!(
            initial_state(&ok, Some("http://h/res")).unwrap(),
            PollerState::Succeeded(Some(_))
        ));
    }
}
