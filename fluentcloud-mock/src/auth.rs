//! Request gates applied in front of every management route: bearer token,
//! `api-version` query parameter and the throttling switch.

use crate::app::AppState;
use crate::error::CloudApiError;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let Some(auth) = headers.get(header::AUTHORIZATION) else {
        return None;
    };
    let Ok(auth) = auth.to_str() else {
        return None;
    };
    let auth = auth.trim();
    let prefix = "Bearer ";
    if auth.len() <= prefix.len() || !auth.starts_with(prefix) {
        return None;
    }
    Some(auth[prefix.len()..].trim().to_string())
}

pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()).filter(|t| !t.is_empty()) else {
        return CloudApiError::unauthorized(
            "AuthenticationFailed",
            "Authentication failed. The 'Authorization' header is missing.",
        )
        .into_response();
    };
    if let Some(expected) = &state.settings.expected_token {
        if &token != expected {
            tracing::debug!("[auth] rejected token for {}", req.uri().path());
            return CloudApiError::unauthorized(
                "InvalidAuthenticationToken",
                "The access token is invalid.",
            )
            .into_response();
        }
    }
    next.run(req).await
}

/// Value of the `api-version` query parameter, if present and non-empty.
pub fn api_version(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "api-version")
        .and_then(|(_, v)| urlencoding::decode(v).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn require_api_version(req: Request<Body>, next: Next) -> Response {
    if api_version(req.uri().query()).is_none() {
        return CloudApiError::bad_request(
            "MissingApiVersionParameter",
            "The api-version query parameter (?api-version=) is required for all requests.",
        )
        .into_response();
    }
    next.run(req).await
}

/// Answers 429 to the first `throttle_requests` mutating requests.
pub async fn throttle(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mutating = matches!(
        *req.method(),
        Method::PUT | Method::PATCH | Method::DELETE | Method::POST
    );
    if mutating && state.should_throttle() {
        tracing::info!("[throttle] {} {} -> 429", req.method(), req.uri().path());
        let mut response = CloudApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "TooManyRequests",
            "The request is being throttled.",
        )
        .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from_static("0"));
        return response;
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_needs_prefix_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc "));
        assert_eq!(extract_bearer(&headers).as_deref(), Some("abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn api_version_from_query() {
        assert_eq!(api_version(Some("api-version=2023-09-01")).as_deref(), Some("2023-09-01"));
        assert_eq!(
            api_version(Some("%24skipToken=3&api-version=2022-09-01")).as_deref(),
            Some("2022-09-01")
        );
        assert_eq!(api_version(Some("api-version=")), None);
        assert_eq!(api_version(None), None);
    }
}
