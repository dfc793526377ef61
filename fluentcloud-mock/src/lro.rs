//! Long-running operation tracking.
//!
//! Every mutating call registers an [`Operation`]; its effect on the store is applied
//! when a client has read its status `polls_to_complete` times.

use crate::services::{self, ServiceKind};
use crate::store::StoreData;
use chrono::{DateTime, Utc};
use fluentcloud_common::compute::PowerState;
use fluentcloud_common::{ErrorDetail, OperationState, OperationStatus, ProvisioningState};
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum Completion {
    /// PUT/PATCH: flip `provisioningState` to its terminal value.
    Provision { resource_id: String, fail: bool },
    Delete {
        resource_id: String,
        kind: ServiceKind,
    },
    DeleteGroup { name: String },
    PowerState {
        resource_id: String,
        state: PowerState,
    },
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub id: String,
    pub completion: Completion,
    pub reads: u32,
    pub status: OperationState,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<ErrorDetail>,
}

impl Operation {
    fn new(completion: Completion) -> Self {
        Operation {
            id: uuid::Uuid::new_v4().to_string(),
            completion,
            reads: 0,
            status: OperationState::InProgress,
            start_time: Utc::now(),
            end_time: None,
            error: None,
        }
    }

    pub fn to_status(&self) -> OperationStatus {
        OperationStatus {
            id: self.id.clone(),
            name: self.id.clone(),
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            error: self.error.clone(),
        }
    }
}

/// Finished operations kept around for late status reads.
const MAX_FINISHED_OPERATIONS: usize = 1024;

/// Registers an operation. Returns its id, or `None` when it completed on the spot
/// (`polls_to_complete == 0`).
pub fn start(data: &mut StoreData, completion: Completion, polls_to_complete: u32) -> Option<String> {
    let mut op = Operation::new(completion);
    if polls_to_complete == 0 {
        finish(data, &mut op);
        return None;
    }
    prune_finished(data, MAX_FINISHED_OPERATIONS);
    let id = op.id.clone();
    debug!("[lro] started {} {:?}", id, op.completion);
    data.operations.insert(id.clone(), op);
    Some(id)
}

/// One status read. Completes the operation once enough reads have been made.
pub fn read(data: &mut StoreData, id: &str, polls_to_complete: u32) -> Option<OperationStatus> {
    let mut op = data.operations.remove(id)?;
    if op.status == OperationState::InProgress {
        op.reads += 1;
        if op.reads >= polls_to_complete {
            finish(data, &mut op);
        }
    }
    let status = op.to_status();
    data.operations.insert(op.id.clone(), op);
    Some(status)
}

/// Drops the oldest finished operations beyond `keep`. Running ones are never touched.
fn prune_finished(data: &mut StoreData, keep: usize) {
    let mut finished: Vec<(DateTime<Utc>, String)> = data
        .operations
        .values()
        .filter_map(|op| op.end_time.map(|t| (t, op.id.clone())))
        .collect();
    if finished.len() <= keep {
        return;
    }
    finished.sort();
    let excess = finished.len() - keep;
    for (_, id) in finished.into_iter().take(excess) {
        data.operations.remove(&id);
    }
    debug!("[lro] pruned {} finished operations", excess);
}

pub fn set_provisioning_state(resource: &mut Value, state: ProvisioningState) {
    if let Some(props) = resource.get_mut("properties").and_then(|p| p.as_object_mut()) {
        props.insert(
            "provisioningState".to_string(),
            Value::String(state.as_str().to_string()),
        );
    }
}

pub fn set_power_state(resource: &mut Value, state: PowerState) {
    if let Some(props) = resource.get_mut("properties").and_then(|p| p.as_object_mut()) {
        props.insert(
            "instanceView".to_string(),
            serde_json::json!({ "powerState": state }),
        );
    }
}

fn finish(data: &mut StoreData, op: &mut Operation) {
    match &op.completion {
        Completion::Provision { resource_id, fail } => {
            let state = if *fail {
                ProvisioningState::Failed
            } else {
                ProvisioningState::Succeeded
            };
            if let Some(resource) = data.resource_mut(resource_id) {
                set_provisioning_state(resource, state);
            }
            if *fail {
                op.status = OperationState::Failed;
                op.error = Some(ErrorDetail {
                    code: "ProvisioningFailed".to_string(),
                    message: format!("provisioning of {} failed", resource_id),
                });
            } else {
                op.status = OperationState::Succeeded;
            }
        }
        Completion::Delete { resource_id, kind } => {
            services::on_deleted(*kind, data, resource_id);
            data.remove_resource(resource_id);
            op.status = OperationState::Succeeded;
        }
        Completion::DeleteGroup { name } => {
            let removed = data.remove_group_cascade(name);
            info!("[lro] deleted group {} with {} resources", name, removed);
            op.status = OperationState::Succeeded;
        }
        Completion::PowerState { resource_id, state } => {
            if let Some(resource) = data.resource_mut(resource_id) {
                set_power_state(resource, *state);
            }
            op.status = OperationState::Succeeded;
        }
    }
    op.end_time = Some(Utc::now());
    debug!("[lro] finished {} as {:?}", op.id, op.status);
}
