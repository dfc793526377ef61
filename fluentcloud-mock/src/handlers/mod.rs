// Handlers module - request handlers and the helpers they share
pub mod compute;
pub mod operations;
pub mod resource_groups;
pub mod resources;

use crate::app::AppState;
use crate::error::{ApiResult, CloudApiError};
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use fluentcloud_common::Page;
use serde::Deserialize;
use serde_json::Value;

pub const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";

#[derive(Debug, Deserialize)]
pub struct ApiQuery {
    #[serde(rename = "api-version")]
    pub api_version: String,
    #[serde(rename = "$skipToken")]
    pub skip_token: Option<String>,
}

/// `http://{Host}` of the incoming request; monitor and next links are absolute.
pub fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");
    format!("http://{}", host)
}

pub fn check_subscription(state: &AppState, subscription_id: &str) -> ApiResult<()> {
    if subscription_id.eq_ignore_ascii_case(&state.settings.subscription_id) {
        Ok(())
    } else {
        Err(CloudApiError::not_found(
            "SubscriptionNotFound",
            format!("The subscription '{}' could not be found.", subscription_id),
        ))
    }
}

/// Request body as JSON; an empty body reads as `None`.
pub fn parse_body(body: &Bytes) -> ApiResult<Option<Value>> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| CloudApiError::bad_request("InvalidRequestContent", e.to_string()))
}

pub fn require_body(body: &Bytes) -> ApiResult<Value> {
    parse_body(body)?.ok_or_else(|| {
        CloudApiError::bad_request("InvalidRequestContent", "The request content was empty")
    })
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) -> ApiResult<()> {
    let value = HeaderValue::from_str(value).map_err(|e| CloudApiError::internal(e.to_string()))?;
    headers.insert(name, value);
    Ok(())
}

/// `Azure-AsyncOperation` + `Retry-After` for an operation started by a PUT or PATCH.
pub fn async_operation_headers(
    state: &AppState,
    base: &str,
    subscription_id: &str,
    operation_id: &str,
    api_version: &str,
) -> ApiResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let url = format!(
        "{}/subscriptions/{}/operations/{}?api-version={}",
        base,
        subscription_id,
        operation_id,
        urlencoding::encode(api_version)
    );
    insert(&mut headers, HeaderName::from_static(ASYNC_OPERATION_HEADER), &url)?;
    insert(
        &mut headers,
        header::RETRY_AFTER,
        &state.settings.retry_after_secs.to_string(),
    )?;
    Ok(headers)
}

/// `Location` + `Retry-After` for an operation started by a DELETE or POST.
pub fn location_headers(
    state: &AppState,
    base: &str,
    subscription_id: &str,
    operation_id: &str,
    api_version: &str,
) -> ApiResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let url = format!(
        "{}/subscriptions/{}/operationResults/{}?api-version={}",
        base,
        subscription_id,
        operation_id,
        urlencoding::encode(api_version)
    );
    insert(&mut headers, header::LOCATION, &url)?;
    insert(
        &mut headers,
        header::RETRY_AFTER,
        &state.settings.retry_after_secs.to_string(),
    )?;
    Ok(headers)
}

/// One page of `items`, starting at the offset carried by `$skipToken`.
pub fn page<T: Clone>(
    items: &[T],
    query: &ApiQuery,
    page_size: usize,
    base: &str,
    path: &str,
) -> ApiResult<Page<T>> {
    let offset = match query.skip_token.as_deref() {
        None => 0,
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            CloudApiError::bad_request("InvalidSkipToken", format!("'{}' is not a valid $skipToken", raw))
        })?,
    };
    let end = offset.saturating_add(page_size).min(items.len());
    let value = items.get(offset..end).map(|s| s.to_vec()).unwrap_or_default();
    let next_link = (end < items.len()).then(|| {
        format!(
            "{}{}?api-version={}&$skipToken={}",
            base,
            path,
            urlencoding::encode(&query.api_version),
            end
        )
    });
    Ok(Page { value, next_link })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(skip: Option<&str>) -> ApiQuery {
        ApiQuery {
            api_version: "2024-03-01".to_string(),
            skip_token: skip.map(|s| s.to_string()),
        }
    }

    #[test]
    fn pages_link_until_exhausted() {
        let items: Vec<u32> = (0..7).collect();
        let first = page(&items, &query(None), 3, "http://h", "/p").unwrap();
        assert_eq!(first.value, vec![0, 1, 2]);
        assert_eq!(
            first.next_link.as_deref(),
            Some("http://h/p?api-version=2024-03-01&$skipToken=3")
        );
        let last = page(&items, &query(Some("6")), 3, "http://h", "/p").unwrap();
        assert_eq!(last.value, vec![6]);
        assert!(last.next_link.is_none());
        let past = page(&items, &query(Some("40")), 3, "http://h", "/p").unwrap();
        assert!(past.value.is_empty());
        assert!(page(&items, &query(Some("x")), 3, "http://h", "/p").is_err());
    }

    #[test]
    fn base_url_defaults_to_localhost() {
        let mut headers = HeaderMap::new();
        assert_eq!(base_url(&headers), "http://localhost");
        headers.insert(header::HOST, HeaderValue::from_static("127.0.0.1:4000"));
        assert_eq!(base_url(&headers), "http://127.0.0.1:4000");
    }
}
