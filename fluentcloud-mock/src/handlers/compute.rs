use super::{base_url, check_subscription, page, ApiQuery};
use crate::app::AppState;
use crate::error::ApiResult;
use crate::services::compute::vm_size_catalog;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Uri};
use axum::Json;
use fluentcloud_common::compute::VirtualMachineSize;
use fluentcloud_common::Page;
use std::sync::Arc;

/// Sizes offered in a region. Every region offers the full catalog.
pub async fn list_vm_sizes(
    State(state): State<Arc<AppState>>,
    Path((subscription_id, location)): Path<(String, String)>,
    Query(query): Query<ApiQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> ApiResult<Json<Page<VirtualMachineSize>>> {
    check_subscription(&state, &subscription_id)?;
    tracing::debug!("[compute] listing vm sizes in {}", location);
    page(
        &vm_size_catalog(),
        &query,
        state.settings.page_size,
        &base_url(&headers),
        uri.path(),
    )
    .map(Json)
}
