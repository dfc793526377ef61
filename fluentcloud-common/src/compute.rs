use crate::{ProvisioningState, Resource};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

pub const NAMESPACE: &str = "Fluent.Compute";
pub const VIRTUAL_MACHINES: &str = "virtualMachines";
pub const DISKS: &str = "disks";
pub const DISK_ENCRYPTION_SETS: &str = "diskEncryptionSets";

// --- Enums ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystemTypes {
    Linux,
    Windows,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CachingTypes {
    None,
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum StorageAccountTypes {
    #[serde(rename = "Standard_LRS")]
    StandardLrs,
    #[serde(rename = "StandardSSD_LRS")]
    StandardSsdLrs,
    #[serde(rename = "Premium_LRS")]
    PremiumLrs,
    #[serde(rename = "UltraSSD_LRS")]
    UltraSsdLrs,
}

impl StorageAccountTypes {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageAccountTypes::StandardLrs => "Standard_LRS",
            StorageAccountTypes::StandardSsdLrs => "StandardSSD_LRS",
            StorageAccountTypes::PremiumLrs => "Premium_LRS",
            StorageAccountTypes::UltraSsdLrs => "UltraSSD_LRS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Standard_LRS" => Some(StorageAccountTypes::StandardLrs),
            "StandardSSD_LRS" => Some(StorageAccountTypes::StandardSsdLrs),
            "Premium_LRS" => Some(StorageAccountTypes::PremiumLrs),
            "UltraSSD_LRS" => Some(StorageAccountTypes::UltraSsdLrs),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DiskCreateOption {
    Empty,
    Attach,
    Copy,
    FromImage,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DiskState {
    Unattached,
    Attached,
    Reserved,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    EncryptionAtRestWithPlatformKey,
    EncryptionAtRestWithCustomerKey,
    EncryptionAtRestWithPlatformAndCustomerKeys,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DiskEncryptionSetType {
    EncryptionAtRestWithCustomerKey,
    EncryptionAtRestWithPlatformAndCustomerKeys,
    ConfidentialVmEncryptedWithCustomerKey,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum IpAllocationMethod {
    Dynamic,
    Static,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Deallocating,
    Deallocated,
}

/// Open-ended VM size name; the known sizes are provided as constants.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct VirtualMachineSizeTypes(Cow<'static, str>);

impl VirtualMachineSizeTypes {
    pub const STANDARD_A1_V2: Self = Self(Cow::Borrowed("Standard_A1_v2"));
    pub const STANDARD_B1S: Self = Self(Cow::Borrowed("Standard_B1s"));
    pub const STANDARD_B2S: Self = Self(Cow::Borrowed("Standard_B2s"));
    pub const STANDARD_D2_V2: Self = Self(Cow::Borrowed("Standard_D2_v2"));
    pub const STANDARD_D2S_V3: Self = Self(Cow::Borrowed("Standard_D2s_v3"));
    pub const STANDARD_D4S_V3: Self = Self(Cow::Borrowed("Standard_D4s_v3"));
    pub const STANDARD_DS2_V2: Self = Self(Cow::Borrowed("Standard_DS2_v2"));
    pub const STANDARD_F2S_V2: Self = Self(Cow::Borrowed("Standard_F2s_v2"));

    pub fn from_name(name: &str) -> Self {
        Self(Cow::Owned(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VirtualMachineSizeTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Shared pieces ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubResource {
    pub id: String,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        SubResource { id: id.into() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDiskParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_type: Option<StorageAccountTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_encryption_set: Option<SubResource>,
}

// --- Virtual machines ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<OperatingSystemTypes>,
    #[serde(rename = "diskSizeGB", default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<CachingTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataDisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lun: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "diskSizeGB", default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<CachingTypes>,
    pub create_option: DiskCreateOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<ImageReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_disk: Option<OsDisk>,
    #[serde(default)]
    pub data_disks: Vec<DataDisk>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SshPublicKey {
    pub path: String,
    pub key_data: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SshConfiguration {
    #[serde(default)]
    pub public_keys: Vec<SshPublicKey>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LinuxConfiguration {
    #[serde(default)]
    pub disable_password_authentication: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh: Option<SshConfiguration>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_username: Option<String>,
    // Write-only: the service never echoes it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux_configuration: Option<LinuxConfiguration>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VmNetworkProfile {
    pub network_id: String,
    pub subnet_name: String,
    pub private_ip_allocation_method: IpAllocationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip_address: Option<String>,
    #[serde(default)]
    pub public_ip_address: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceView {
    pub power_state: PowerState,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<VirtualMachineSizeTypes>,
    #[serde(default)]
    pub storage_profile: StorageProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_profile: Option<OsProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<VmNetworkProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_view: Option<InstanceView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

pub type VirtualMachineData = Resource<VirtualMachineProperties>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineSize {
    pub name: String,
    pub number_of_cores: i32,
    #[serde(rename = "memoryInMB")]
    pub memory_in_mb: i32,
    pub max_data_disk_count: i32,
    #[serde(rename = "osDiskSizeInMB")]
    pub os_disk_size_in_mb: i32,
    #[serde(rename = "resourceDiskSizeInMB")]
    pub resource_disk_size_in_mb: i32,
}

// --- Disks ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreationData {
    pub create_option: DiskCreateOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_resource_id: Option<String>,
}

impl Default for CreationData {
    fn default() -> Self {
        CreationData {
            create_option: DiskCreateOption::Empty,
            source_resource_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Encryption {
    #[serde(rename = "type")]
    pub encryption_type: EncryptionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_encryption_set_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DiskProperties {
    #[serde(rename = "diskSizeGB", default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,
    #[serde(default)]
    pub creation_data: CreationData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<Encryption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<OperatingSystemTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_state: Option<DiskState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

pub type DiskData = Resource<DiskProperties>;

// --- Disk encryption sets ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyForDiskEncryptionSet {
    pub key_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_vault: Option<SubResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DiskEncryptionSetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_type: Option<DiskEncryptionSetType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_key: Option<KeyForDiskEncryptionSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_to_latest_key_version_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

pub type DiskEncryptionSetData = Resource<DiskEncryptionSetProperties>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Region;

    #[test]
    fn disk_size_uses_service_casing() {
        let mut disk: DiskData = Resource::new(Region::US_EAST);
        disk.properties.disk_size_gb = Some(150);
        let value = serde_json::to_value(&disk).unwrap();
        assert_eq!(value["properties"]["diskSizeGB"], 150);
        assert_eq!(value["properties"]["creationData"]["createOption"], "Empty");
    }

    #[test]
    fn storage_account_type_names() {
        let value = serde_json::to_value(StorageAccountTypes::StandardSsdLrs).unwrap();
        assert_eq!(value, "StandardSSD_LRS");
        assert_eq!(
            StorageAccountTypes::from_name("Premium_LRS"),
            Some(StorageAccountTypes::PremiumLrs)
        );
    }
}
