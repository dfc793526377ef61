use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

pub mod cache;
pub mod compute;
pub mod container;
pub mod network;
pub mod resource_id;

pub use resource_id::{ResourceId, ResourceIdError};

/// Tag prefix reserved for mock-service behavior switches.
pub const MOCK_TAG_FAIL_PROVISIONING: &str = "fluentcloud-mock:fail-provisioning";

// --- Enums ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningState {
    Creating,
    Updating,
    Deleting,
    Succeeded,
    Failed,
    Canceled,
}

impl ProvisioningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningState::Creating => "Creating",
            ProvisioningState::Updating => "Updating",
            ProvisioningState::Deleting => "Deleting",
            ProvisioningState::Succeeded => "Succeeded",
            ProvisioningState::Failed => "Failed",
            ProvisioningState::Canceled => "Canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProvisioningState::Succeeded | ProvisioningState::Failed | ProvisioningState::Canceled
        )
    }
}

impl Default for ProvisioningState {
    fn default() -> Self {
        ProvisioningState::Succeeded
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationState::InProgress)
    }
}

// --- Regions ---

/// A deployment region, stored by its canonical lower-case name ("eastus").
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Region(Cow<'static, str>);

impl Region {
    pub const US_EAST: Region = Region(Cow::Borrowed("eastus"));
    pub const US_EAST2: Region = Region(Cow::Borrowed("eastus2"));
    pub const US_WEST: Region = Region(Cow::Borrowed("westus"));
    pub const US_WEST2: Region = Region(Cow::Borrowed("westus2"));
    pub const US_WEST3: Region = Region(Cow::Borrowed("westus3"));
    pub const US_CENTRAL: Region = Region(Cow::Borrowed("centralus"));
    pub const EUROPE_WEST: Region = Region(Cow::Borrowed("westeurope"));
    pub const EUROPE_NORTH: Region = Region(Cow::Borrowed("northeurope"));
    pub const ASIA_SOUTHEAST: Region = Region(Cow::Borrowed("southeastasia"));

    /// Accepts either the canonical name or a display label ("West US 2").
    pub fn from_name(name: &str) -> Region {
        let canonical: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Region(Cow::Owned(canonical))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Region {
    fn from(value: &str) -> Self {
        Region::from_name(value)
    }
}

// --- Envelope ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManagedIdentity {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl ManagedIdentity {
    pub fn system_assigned() -> Self {
        ManagedIdentity {
            identity_type: "SystemAssigned".to_string(),
            principal_id: None,
            tenant_id: None,
        }
    }
}

/// Wire envelope shared by every groupable resource.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource<P> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub location: Region,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ManagedIdentity>,
    pub properties: P,
}

impl<P: Default> Resource<P> {
    pub fn new(location: Region) -> Self {
        Resource {
            id: None,
            name: None,
            resource_type: None,
            location,
            tags: BTreeMap::new(),
            sku: None,
            identity: None,
            properties: P::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

pub type ResourceGroupData = Resource<ResourceGroupProperties>;

// --- Paging / operations / errors ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CloudError {
    pub error: ErrorDetail,
}

impl CloudError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        CloudError {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    pub id: String,
    pub name: String,
    pub status: OperationState,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_from_display_name() {
        assert_eq!(Region::from_name("West US 2"), Region::US_WEST2);
        assert_eq!(Region::from("EastUS").name(), "eastus");
    }

    #[test]
    fn envelope_skips_empty_optionals() {
        let rg: ResourceGroupData = Resource::new(Region::US_EAST);
        let value = serde_json::to_value(&rg).unwrap();
        assert_eq!(value["location"], "eastus");
        assert!(value.get("sku").is_none());
        assert!(value.get("id").is_none());
    }

    #[test]
    fn operation_status_wire_shape() {
        let raw = r#"{"id":"op1","name":"op1","status":"InProgress","startTime":"2024-01-01T00:00:00Z"}"#;
        let status: OperationStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(status.status, OperationState::InProgress);
        assert!(!status.status.is_terminal());
    }
}
