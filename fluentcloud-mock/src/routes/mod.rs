// Routes module - centralizes all route definitions
use crate::app::AppState;
use crate::auth;
use crate::handlers::{compute, operations, resource_groups, resources};
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

async fn root() -> Json<Value> {
    Json(json!({
        "service": "fluentcloud-mock",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Management surface: bearer token, `api-version` and throttling apply to every route.
pub fn create_management_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/subscriptions/{subscription_id}/resourceGroups",
            get(resource_groups::list_groups),
        )
        .route(
            "/subscriptions/{subscription_id}/resourceGroups/{resource_group}",
            get(resource_groups::get_group)
                .put(resource_groups::put_group)
                .patch(resource_groups::patch_group)
                .delete(resource_groups::delete_group),
        )
        .route(
            "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/{namespace}/{resource_type}",
            get(resources::list_resources),
        )
        .route(
            "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/{namespace}/{resource_type}/{name}",
            get(resources::get_resource)
                .put(resources::put_resource)
                .patch(resources::patch_resource)
                .delete(resources::delete_resource),
        )
        .route(
            "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/{namespace}/{resource_type}/{name}/{action}",
            axum::routing::post(resources::resource_action),
        )
        .route(
            "/subscriptions/{subscription_id}/providers/Fluent.Compute/locations/{location}/vmSizes",
            get(compute::list_vm_sizes),
        )
        .route(
            "/subscriptions/{subscription_id}/operations/{operation_id}",
            get(operations::operation_status),
        )
        .route(
            "/subscriptions/{subscription_id}/operationResults/{operation_id}",
            get(operations::operation_result),
        )
        // Layers run bottom-up: auth, then api-version, then throttling.
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::throttle))
        .route_layer(middleware::from_fn(auth::require_api_version))
        .route_layer(middleware::from_fn_with_state(state, auth::require_bearer))
}

/// Build the main application router
pub fn create_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .merge(create_management_routes(state))
}
