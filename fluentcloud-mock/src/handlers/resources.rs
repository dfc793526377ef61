//! Generic CRUD, list and action handlers for every provider resource type.
//!
//! Resources are stored as JSON; per-type validation and defaults live in
//! [`crate::services`].

use super::resource_groups::group_not_found;
use super::{
    async_operation_headers, base_url, check_subscription, location_headers, page, parse_body,
    require_body, ApiQuery,
};
use crate::app::AppState;
use crate::error::{ApiResult, CloudApiError};
use crate::lro::{self, Completion};
use crate::services::{self, ActionOutcome, ServiceKind};
use crate::store::StoreData;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use fluentcloud_common::{Page, ProvisioningState, ResourceId, MOCK_TAG_FAIL_PROVISIONING};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

type ResourcePath = (String, String, String, String, String);
type CollectionPath = (String, String, String, String);
type ActionPath = (String, String, String, String, String, String);

/// Group name as it was created; ids keep that casing.
fn canonical_group(data: &StoreData, name: &str) -> ApiResult<String> {
    data.group(name)
        .map(|g| g.name.clone().unwrap_or_else(|| name.to_string()))
        .ok_or_else(|| group_not_found(name))
}

/// Like [`canonical_group`], but refuses groups whose deletion is pending.
fn writable_group(data: &StoreData, name: &str) -> ApiResult<String> {
    let group = canonical_group(data, name)?;
    let deleting = data
        .group(name)
        .map(|g| g.properties.provisioning_state == Some(ProvisioningState::Deleting))
        .unwrap_or(false);
    if deleting {
        return Err(CloudApiError::conflict(
            "ResourceGroupBeingDeleted",
            format!("Resource group '{}' is being deleted.", group),
        ));
    }
    Ok(group)
}

fn resource_not_found(kind: ServiceKind, group: &str, name: &str) -> CloudApiError {
    CloudApiError::not_found(
        "ResourceNotFound",
        format!(
            "The Resource '{}/{}' under resource group '{}' was not found.",
            kind.full_type(),
            name,
            group
        ),
    )
}

fn provisioning_state(resource: &Value) -> &str {
    resource
        .pointer("/properties/provisioningState")
        .and_then(|s| s.as_str())
        .unwrap_or("Succeeded")
}

fn ensure_idle(resource: &Value) -> ApiResult<()> {
    match provisioning_state(resource) {
        state @ ("Creating" | "Updating" | "Deleting") => Err(CloudApiError::conflict(
            "AnotherOperationInProgress",
            format!("Another operation is in progress on this resource ({})", state),
        )),
        _ => Ok(()),
    }
}

/// Read-only envelope fields always come from the path.
fn stamp(resource: &mut Value, id: &str, name: &str, kind: ServiceKind) -> ApiResult<()> {
    let obj = resource.as_object_mut().ok_or_else(|| {
        CloudApiError::bad_request("InvalidRequestContent", "The request content must be an object")
    })?;
    obj.insert("id".to_string(), Value::String(id.to_string()));
    obj.insert("name".to_string(), Value::String(name.to_string()));
    obj.insert("type".to_string(), Value::String(kind.full_type()));
    Ok(())
}

fn wants_failure(resource: &Value) -> bool {
    resource
        .get("tags")
        .and_then(|t| t.get(MOCK_TAG_FAIL_PROVISIONING))
        .and_then(|v| v.as_str())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// JSON merge patch: objects merge recursively, `null` removes, anything else replaces.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (k, v) in fields {
            if v.is_null() {
                map.remove(k);
            } else {
                merge_patch(map.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
    }
}

struct WriteContext<'a> {
    state: &'a AppState,
    subscription_id: &'a str,
    api_version: &'a str,
    base: String,
}

/// Shared tail of PUT and PATCH: validate, store in a transitional state, start the operation.
fn write_resource(
    ctx: &WriteContext<'_>,
    data: &mut StoreData,
    kind: ServiceKind,
    rid: &ResourceId,
    existing: Option<Value>,
    mut body: Value,
) -> ApiResult<Response> {
    let id = rid.to_string();
    stamp(&mut body, &id, rid.name(), kind)?;
    if let Some(current) = &existing {
        ensure_idle(current)?;
        let before = current.get("location").and_then(|l| l.as_str());
        let after = body.get("location").and_then(|l| l.as_str());
        if let (Some(before), Some(after)) = (before, after) {
            if !before.eq_ignore_ascii_case(after) {
                return Err(CloudApiError::conflict(
                    "InvalidResourceLocation",
                    format!("Resource {} already exists in location {}", rid.name(), before),
                ));
            }
        }
    }
    let fail = wants_failure(&body);
    let updating = existing.is_some();

    let mut out = services::provision(kind, data, rid, existing, body)?;
    stamp(&mut out, &id, rid.name(), kind)?;
    let transitional = if updating {
        ProvisioningState::Updating
    } else {
        ProvisioningState::Creating
    };
    lro::set_provisioning_state(&mut out, transitional);
    data.insert_resource(&id, out);
    info!(
        "[resources] {} {} {}",
        if updating { "updating" } else { "creating" },
        kind.full_type(),
        rid.name()
    );

    let completion = Completion::Provision {
        resource_id: id.clone(),
        fail,
    };
    let op = lro::start(data, completion, ctx.state.settings.polls_to_complete);
    let stored = data.resource(&id).cloned().unwrap_or(Value::Null);
    let status = if updating {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    match op {
        None => Ok((status, Json(stored)).into_response()),
        Some(op) => {
            let headers = async_operation_headers(
                ctx.state,
                &ctx.base,
                ctx.subscription_id,
                &op,
                ctx.api_version,
            )?;
            Ok((status, headers, Json(stored)).into_response())
        }
    }
}

pub async fn put_resource(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, resource_group, namespace, resource_type, name)): Path<ResourcePath>,
    Query(query): Query<ApiQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    check_subscription(&state, &subscription_id)?;
    let kind = ServiceKind::resolve(&namespace, &resource_type)?;
    let body = require_body(&body)?;

    let mut data = state.store.write().await;
    let group = writable_group(&data, &resource_group)?;
    let rid = ResourceId::resource(
        &state.settings.subscription_id,
        &group,
        kind.namespace(),
        kind.type_name(),
        &name,
    );
    let existing = data.resource(&rid.to_string()).cloned();
    let ctx = WriteContext {
        state: &state,
        subscription_id: &subscription_id,
        api_version: &query.api_version,
        base: base_url(&headers),
    };
    write_resource(&ctx, &mut data, kind, &rid, existing, body)
}

/// Tags are replaced wholesale; everything else is merge-patched onto the stored resource.
pub async fn patch_resource(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, resource_group, namespace, resource_type, name)): Path<ResourcePath>,
    Query(query): Query<ApiQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    check_subscription(&state, &subscription_id)?;
    let kind = ServiceKind::resolve(&namespace, &resource_type)?;
    let mut patch = require_body(&body)?;

    let mut data = state.store.write().await;
    let group = writable_group(&data, &resource_group)?;
    let rid = ResourceId::resource(
        &state.settings.subscription_id,
        &group,
        kind.namespace(),
        kind.type_name(),
        &name,
    );
    let existing = data
        .resource(&rid.to_string())
        .cloned()
        .ok_or_else(|| resource_not_found(kind, &group, &name))?;

    let mut merged = existing.clone();
    let tags = patch.as_object_mut().and_then(|p| p.remove("tags"));
    merge_patch(&mut merged, &patch);
    if let (Some(tags), Some(obj)) = (tags.filter(|t| !t.is_null()), merged.as_object_mut()) {
        obj.insert("tags".to_string(), tags);
    }
    let ctx = WriteContext {
        state: &state,
        subscription_id: &subscription_id,
        api_version: &query.api_version,
        base: base_url(&headers),
    };
    write_resource(&ctx, &mut data, kind, &rid, Some(existing), merged)
}

pub async fn get_resource(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, resource_group, namespace, resource_type, name)): Path<ResourcePath>,
) -> ApiResult<Json<Value>> {
    check_subscription(&state, &subscription_id)?;
    let kind = ServiceKind::resolve(&namespace, &resource_type)?;
    let data = state.store.read().await;
    let group = canonical_group(&data, &resource_group)?;
    let id = ResourceId::resource(
        &state.settings.subscription_id,
        &group,
        kind.namespace(),
        kind.type_name(),
        &name,
    )
    .to_string();
    data.resource(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| resource_not_found(kind, &group, &name))
}

pub async fn delete_resource(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, resource_group, namespace, resource_type, name)): Path<ResourcePath>,
    Query(query): Query<ApiQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    check_subscription(&state, &subscription_id)?;
    let kind = ServiceKind::resolve(&namespace, &resource_type)?;
    let mut data = state.store.write().await;
    let group = canonical_group(&data, &resource_group)?;
    let id = ResourceId::resource(
        &state.settings.subscription_id,
        &group,
        kind.namespace(),
        kind.type_name(),
        &name,
    )
    .to_string();

    let Some(resource) = data.resource_mut(&id) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    ensure_idle(resource)?;
    services::check_delete(kind, &data, &id)?;
    if let Some(resource) = data.resource_mut(&id) {
        lro::set_provisioning_state(resource, ProvisioningState::Deleting);
    }
    info!("[resources] deleting {} {}", kind.full_type(), name);

    let completion = Completion::Delete {
        resource_id: id,
        kind,
    };
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

pub async fn list_resources(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, resource_group, namespace, resource_type)): Path<CollectionPath>,
    Query(query): Query<ApiQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> ApiResult<Json<Page<Value>>> {
    check_subscription(&state, &subscription_id)?;
    let kind = ServiceKind::resolve(&namespace, &resource_type)?;
    let data = state.store.read().await;
    let group = canonical_group(&data, &resource_group)?;
    let items = data.resources_of_type(Some(&group), &kind.full_type());
    page(
        &items,
        &query,
        state.settings.page_size,
        &base_url(&headers),
        uri.path(),
    )
    .map(Json)
}

pub async fn resource_action(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, resource_group, namespace, resource_type, name, action)): Path<ActionPath>,
    Query(query): Query<ApiQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    check_subscription(&state, &subscription_id)?;
    let kind = ServiceKind::resolve(&namespace, &resource_type)?;
    let body = parse_body(&body)?;
    let mut data = state.store.write().await;
    let group = writable_group(&data, &resource_group)?;
    let id = ResourceId::resource(
        &state.settings.subscription_id,
        &group,
        kind.namespace(),
        kind.type_name(),
        &name,
    )
    .to_string();
    let resource = data
        .resource(&id)
        .ok_or_else(|| resource_not_found(kind, &group, &name))?;
    ensure_idle(resource)?;

    match services::action(kind, &mut data, &id, &action, body)? {
        ActionOutcome::Body(value) => Ok((StatusCode::OK, Json(value)).into_response()),
        ActionOutcome::LongRunning {
            transitional,
            terminal,
        } => {
            if let Some(resource) = data.resource_mut(&id) {
                lro::set_power_state(resource, transitional);
            }
            info!("[resources] {} on {} {}", action, kind.full_type(), name);
            let completion = Completion::PowerState {
                resource_id: id,
                state: terminal,
            };
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
    }
}
