use super::{base_url, check_subscription, location_headers, ApiQuery};
use crate::app::AppState;
use crate::error::{ApiResult, CloudApiError};
use crate::lro;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use fluentcloud_common::OperationState;
use std::sync::Arc;

fn operation_not_found(id: &str) -> CloudApiError {
    CloudApiError::not_found(
        "OperationNotFound",
        format!("The operation '{}' could not be found.", id),
    )
}

/// `Azure-AsyncOperation` monitor: always 200 with the operation status body.
pub async fn operation_status(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, operation_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    check_subscription(&state, &subscription_id)?;
    let mut data = state.store.write().await;
    let status = lro::read(&mut data, &operation_id, state.settings.polls_to_complete)
        .ok_or_else(|| operation_not_found(&operation_id))?;
    let mut response = Json(&status).into_response();
    if status.status == OperationState::InProgress {
        let retry = HeaderValue::from_str(&state.settings.retry_after_secs.to_string())
            .map_err(|e| CloudApiError::internal(e.to_string()))?;
        response.headers_mut().insert(header::RETRY_AFTER, retry);
    }
    Ok(response)
}

/// `Location` monitor: 202 while running, 204 once done.
pub async fn operation_result(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, operation_id)): Path<(String, String)>,
    Query(query): Query<ApiQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    check_subscription(&state, &subscription_id)?;
    let mut data = state.store.write().await;
    let status = lro::read(&mut data, &operation_id, state.settings.polls_to_complete)
        .ok_or_else(|| operation_not_found(&operation_id))?;
    match status.status {
        OperationState::InProgress => {
            let headers = location_headers(
                &state,
                &base_url(&headers),
                &subscription_id,
                &operation_id,
                &query.api_version,
            )?;
            Ok((StatusCode::ACCEPTED, headers).into_response())
        }
        OperationState::Succeeded => Ok(StatusCode::NO_CONTENT.into_response()),
        OperationState::Failed | OperationState::Canceled => {
            let (code, message) = status
                .error
                .map(|e| (e.code, e.message))
                .unwrap_or_else(|| ("OperationFailed".to_string(), operation_id.clone()));
            Err(CloudApiError::new(StatusCode::CONFLICT, &code, message))
        }
    }
}
