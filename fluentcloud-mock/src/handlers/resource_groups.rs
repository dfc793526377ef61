use super::{base_url, check_subscription, location_headers, page, require_body, ApiQuery};
use crate::app::AppState;
use crate::error::{ApiResult, CloudApiError};
use crate::lro::{self, Completion};
use crate::store::key;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use fluentcloud_common::{Page, ProvisioningState, ResourceGroupData, ResourceId};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const RESOURCE_GROUP_TYPE: &str = "Fluent.Resources/resourceGroups";

pub fn group_not_found(name: &str) -> CloudApiError {
    CloudApiError::not_found(
        "ResourceGroupNotFound",
        format!("Resource group '{}' could not be found.", name),
    )
}

pub async fn put_group(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, name)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Response> {
    check_subscription(&state, &subscription_id)?;
    let body = require_body(&body)?;
    let mut group: ResourceGroupData = serde_json::from_value(body)
        .map_err(|e| CloudApiError::bad_request("InvalidRequestContent", e.to_string()))?;

    let mut data = state.store.write().await;
    let (status, name) = match data.group(&name) {
        Some(existing) => {
            if existing.properties.provisioning_state == Some(ProvisioningState::Deleting) {
                return Err(CloudApiError::conflict(
                    "ResourceGroupBeingDeleted",
                    format!("Resource group '{}' is being deleted.", name),
                ));
            }
            if existing.location != group.location {
                return Err(CloudApiError::conflict(
                    "InvalidResourceGroupLocation",
                    format!(
                        "Resource group '{}' already exists in location '{}'.",
                        name, existing.location
                    ),
                ));
            }
            (
                StatusCode::OK,
                existing.name.clone().unwrap_or_else(|| name.clone()),
            )
        }
        None => (StatusCode::CREATED, name.clone()),
    };

    group.id = Some(ResourceId::resource_group(&state.settings.subscription_id, &name).to_string());
    group.name = Some(name.clone());
    group.resource_type = Some(RESOURCE_GROUP_TYPE.to_string());
    group.properties.provisioning_state = Some(ProvisioningState::Succeeded);
    if status == StatusCode::CREATED {
        info!("[resource_groups] created {} in {}", name, group.location);
    }
    data.groups.insert(key(&name), group.clone());
    Ok((status, Json(group)).into_response())
}

pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, name)): Path<(String, String)>,
) -> ApiResult<Json<ResourceGroupData>> {
    check_subscription(&state, &subscription_id)?;
    let data = state.store.read().await;
    data.group(&name)
        .cloned()
        .map(Json)
        .ok_or_else(|| group_not_found(&name))
}

/// Only tags can change on a group; they are replaced wholesale.
pub async fn patch_group(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, name)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<ResourceGroupData>> {
    check_subscription(&state, &subscription_id)?;
    let patch = require_body(&body)?;
    let mut data = state.store.write().await;
    let group = data.group_mut(&name).ok_or_else(|| group_not_found(&name))?;
    if let Some(tags) = patch.get("tags").filter(|t| !t.is_null()) {
        group.tags = serde_json::from_value(tags.clone())
            .map_err(|e| CloudApiError::bad_request("InvalidRequestContent", e.to_string()))?;
    }
    Ok(Json(group.clone()))
}

pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, name)): Path<(String, String)>,
    Query(query): Query<ApiQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    check_subscription(&state, &subscription_id)?;
    let mut data = state.store.write().await;
    let Some(group) = data.group_mut(&name) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    group.properties.provisioning_state = Some(ProvisioningState::Deleting);
    info!("[resource_groups] deleting {}", name);

    let completion = Completion::DeleteGroup { name: name.clone() };
    match lro::start(&mut data, completion, state.settings.polls_to_complete) {
        None => Ok(StatusCode::OK.into_response()),
        Some(op) => {
            let headers = location_headers(
                &state,
                &base_url(&headers),
                &subscription_id,
                &op,
                &query.api_version,
            )?;
            Ok((StatusCode::ACCEPTED, headers).into_response())
        }
    }
}

pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    Path(subscription_id): Path<String>,
    Query(query): Query<ApiQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> ApiResult<Json<Page<Value>>> {
    check_subscription(&state, &subscription_id)?;
    let data = state.store.read().await;
    let groups = data
        .groups
        .values()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CloudApiError::internal(e.to_string()))?;
    page(
        &groups,
        &query,
        state.settings.page_size,
        &base_url(&headers),
        uri.path(),
    )
    .map(Json)
}
