use super::{all_of, lookup, same_id, ActionOutcome, ServiceKind};
use crate::error::{ApiResult, CloudApiError};
use crate::store::StoreData;
use fluentcloud_common::compute::{
    CachingTypes, DiskCreateOption, DiskData, DiskEncryptionSetData, DiskEncryptionSetType,
    DiskState, Encryption, EncryptionType, InstanceView, IpAllocationMethod,
    ManagedDiskParameters, OperatingSystemTypes, OsProfile, PowerState, StorageAccountTypes,
    VirtualMachineData, VirtualMachineSize, VirtualMachineSizeTypes,
};
use fluentcloud_common::network::{Ipv4Cidr, NetworkData};
use fluentcloud_common::{ManagedIdentity, ResourceId, Sku};
use serde_json::Value;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use tracing::debug;

const LINUX_OS_DISK_GB: i32 = 30;
const WINDOWS_OS_DISK_GB: i32 = 127;
const MAX_DISK_GB: i32 = 32767;
const MAX_LUN: i32 = 63;
/// First usable host offset in a subnet; lower addresses are reserved by the platform.
const FIRST_HOST_OFFSET: u32 = 4;

const OS_DISK_SIZE_MB: i32 = 1_047_552;

fn size(name: &str, cores: i32, memory_mb: i32, max_disks: i32, resource_mb: i32) -> VirtualMachineSize {
    VirtualMachineSize {
        name: name.to_string(),
        number_of_cores: cores,
        memory_in_mb: memory_mb,
        max_data_disk_count: max_disks,
        os_disk_size_in_mb: OS_DISK_SIZE_MB,
        resource_disk_size_in_mb: resource_mb,
    }
}

/// Sizes offered in every region.
pub fn vm_size_catalog() -> Vec<VirtualMachineSize> {
    vec![
        size("Standard_A1_v2", 1, 2048, 2, 10240),
        size("Standard_B1s", 1, 1024, 2, 4096),
        size("Standard_B2s", 2, 4096, 4, 8192),
        size("Standard_D2_v2", 2, 7168, 8, 102400),
        size("Standard_D2s_v3", 2, 8192, 4, 16384),
        size("Standard_D4s_v3", 4, 16384, 8, 32768),
        size("Standard_DS2_v2", 2, 7168, 8, 14336),
        size("Standard_F2s_v2", 2, 4096, 4, 16384),
    ]
}

fn find_size(name: &str) -> Option<VirtualMachineSize> {
    vm_size_catalog()
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
}

fn invalid(message: impl Into<String>) -> CloudApiError {
    CloudApiError::invalid_parameter(message)
}

fn not_allowed(message: impl Into<String>) -> CloudApiError {
    CloudApiError::conflict("OperationNotAllowed", message)
}

fn require_disk_encryption_set(data: &StoreData, id: &str) -> ApiResult<()> {
    lookup::<fluentcloud_common::compute::DiskEncryptionSetProperties>(
        data,
        ServiceKind::DiskEncryptionSet,
        id,
    )
    .map(|_| ())
    .ok_or_else(|| {
        CloudApiError::bad_request(
            "InvalidResourceReference",
            format!("Disk encryption set {} was not found", id),
        )
    })
}

fn set_disk_attachment(data: &mut StoreData, disk_id: &str, vm_id: Option<&str>) {
    let Some(props) = data
        .resource_mut(disk_id)
        .and_then(|d| d.get_mut("properties"))
        .and_then(|p| p.as_object_mut())
    else {
        return;
    };
    match vm_id {
        Some(vm) => {
            props.insert("diskState".to_string(), Value::String("Attached".to_string()));
            props.insert("managedBy".to_string(), Value::String(vm.to_string()));
        }
        None => {
            props.insert("diskState".to_string(), Value::String("Unattached".to_string()));
            props.remove("managedBy");
        }
    }
}

fn attached_disk_ids(vm: &VirtualMachineData) -> Vec<String> {
    vm.properties
        .storage_profile
        .data_disks
        .iter()
        .filter(|d| d.create_option == DiskCreateOption::Attach)
        .filter_map(|d| d.managed_disk.as_ref().and_then(|m| m.id.clone()))
        .collect()
}

fn validate_os_profile(profile: Option<&OsProfile>, os_type: OperatingSystemTypes) -> ApiResult<()> {
    let profile = profile.ok_or_else(|| invalid("osProfile is required"))?;
    let username = profile.admin_username.as_deref().unwrap_or_default();
    if username.trim().is_empty() {
        return Err(invalid("osProfile.adminUsername is required"));
    }
    if username.eq_ignore_ascii_case("root") || username.eq_ignore_ascii_case("admin") {
        return Err(invalid(format!("The admin username '{}' is reserved", username)));
    }
    let has_password = profile
        .admin_password
        .as_deref()
        .map(|p| !p.is_empty())
        .unwrap_or(false);
    match os_type {
        OperatingSystemTypes::Linux => {
            let has_key = profile
                .linux_configuration
                .as_ref()
                .and_then(|l| l.ssh.as_ref())
                .map(|s| !s.public_keys.is_empty())
                .unwrap_or(false);
            if !has_password && !has_key {
                return Err(invalid(
                    "A Linux virtual machine needs an admin password or an SSH public key",
                ));
            }
        }
        OperatingSystemTypes::Windows => {
            if !has_password {
                return Err(invalid("A Windows virtual machine needs an admin password"));
            }
        }
    }
    Ok(())
}

/// Private address for the VM, honouring static requests and handing out the lowest
/// free dynamic address otherwise.
fn assign_private_ip(
    data: &StoreData,
    vm_id: &str,
    existing: Option<&VirtualMachineData>,
    network: &NetworkData,
    subnet_name: &str,
    method: IpAllocationMethod,
    requested: Option<&str>,
) -> ApiResult<String> {
    let subnet = network
        .properties
        .subnets
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(subnet_name))
        .ok_or_else(|| {
            CloudApiError::bad_request(
                "InvalidResourceReference",
                format!("Subnet {} was not found in the network", subnet_name),
            )
        })?;
    let cidr = Ipv4Cidr::parse(&subnet.address_prefix)
        .ok_or_else(|| CloudApiError::internal("stored subnet prefix is invalid"))?;
    let network_id = network.id.as_deref().unwrap_or_default();

    let taken: Vec<Ipv4Addr> = all_of::<fluentcloud_common::compute::VirtualMachineProperties>(
        data,
        ServiceKind::VirtualMachine,
    )
    .into_iter()
    .filter(|vm| !same_id(vm.id.as_deref().unwrap_or_default(), vm_id))
    .filter_map(|vm| vm.properties.network_profile)
    .filter(|p| same_id(&p.network_id, network_id) && p.subnet_name.eq_ignore_ascii_case(subnet_name))
    .filter_map(|p| p.private_ip_address.and_then(|ip| ip.parse().ok()))
    .collect();

    let usable = |ip: Ipv4Addr| {
        let offset = u32::from(ip).wrapping_sub(u32::from(cidr.network_address())) as u64;
        cidr.contains(ip) && offset >= FIRST_HOST_OFFSET as u64 && offset + 1 < cidr.size()
    };

    match method {
        IpAllocationMethod::Static => {
            let raw = requested
                .ok_or_else(|| invalid("privateIpAddress is required for Static allocation"))?;
            let ip: Ipv4Addr = raw
                .parse()
                .map_err(|_| invalid(format!("'{}' is not a valid IPv4 address", raw)))?;
            if !usable(ip) {
                return Err(CloudApiError::bad_request(
                    "PrivateIPAddressNotInSubnet",
                    format!("{} is not a usable address of subnet {}", ip, subnet.address_prefix),
                ));
            }
            if taken.contains(&ip) {
                return Err(CloudApiError::conflict(
                    "PrivateIPAddressInUse",
                    format!("{} is already in use", ip),
                ));
            }
            Ok(ip.to_string())
        }
        IpAllocationMethod::Dynamic => {
            let kept = existing
                .and_then(|vm| vm.properties.network_profile.as_ref())
                .filter(|p| same_id(&p.network_id, network_id))
                .filter(|p| p.subnet_name.eq_ignore_ascii_case(subnet_name))
                .and_then(|p| p.private_ip_address.as_deref())
                .and_then(|ip| ip.parse::<Ipv4Addr>().ok())
                .filter(|ip| !taken.contains(ip));
            if let Some(ip) = kept {
                return Ok(ip.to_string());
            }
            (FIRST_HOST_OFFSET..)
                .map_while(|offset| cidr.host(offset))
                .find(|ip| usable(*ip) && !taken.contains(ip))
                .map(|ip| ip.to_string())
                .ok_or_else(|| {
                    CloudApiError::conflict(
                        "SubnetIsFull",
                        format!("Subnet {} has no free address", subnet.address_prefix),
                    )
                })
        }
    }
}

pub fn provision_vm(
    data: &mut StoreData,
    id: &ResourceId,
    existing: Option<VirtualMachineData>,
    mut vm: VirtualMachineData,
) -> ApiResult<VirtualMachineData> {
    let vm_id = id.to_string();
    let vm_name = id.name().to_string();

    let size_name = vm
        .properties
        .vm_size
        .clone()
        .unwrap_or(VirtualMachineSizeTypes::STANDARD_A1_V2);
    let size = find_size(size_name.as_str()).ok_or_else(|| {
        CloudApiError::conflict(
            "SkuNotAvailable",
            format!("The requested size {} is not available", size_name),
        )
    })?;
    vm.properties.vm_size = Some(VirtualMachineSizeTypes::from_name(&size.name));

    let current_os_disk = existing
        .as_ref()
        .and_then(|c| c.properties.storage_profile.os_disk.clone());

    // Image and OS profile are fixed at creation.
    match &existing {
        Some(current) => {
            vm.properties.storage_profile.image_reference =
                current.properties.storage_profile.image_reference.clone();
            vm.properties.os_profile = current.properties.os_profile.clone();
        }
        None => {
            if vm.properties.storage_profile.image_reference.is_none() {
                return Err(invalid("storageProfile.imageReference is required"));
            }
        }
    }

    // OS disk
    let mut os_disk = vm.properties.storage_profile.os_disk.take().unwrap_or_default();
    let os_type = current_os_disk
        .as_ref()
        .and_then(|d| d.os_type)
        .or(os_disk.os_type)
        .unwrap_or(OperatingSystemTypes::Linux);
    os_disk.os_type = Some(os_type);
    if existing.is_none() {
        validate_os_profile(vm.properties.os_profile.as_ref(), os_type)?;
        if let Some(profile) = vm.properties.os_profile.as_mut() {
            if profile.computer_name.is_none() {
                profile.computer_name = Some(vm_name.clone());
            }
        }
    }
    let current_os_size = current_os_disk.as_ref().and_then(|d| d.disk_size_gb);
    let default_os_size = match os_type {
        OperatingSystemTypes::Linux => LINUX_OS_DISK_GB,
        OperatingSystemTypes::Windows => WINDOWS_OS_DISK_GB,
    };
    let os_size = os_disk
        .disk_size_gb
        .or(current_os_size)
        .unwrap_or(default_os_size);
    if os_size < default_os_size || os_size > 4095 {
        return Err(invalid(format!(
            "OS disk size {} GB is outside the allowed range",
            os_size
        )));
    }
    if let Some(current) = current_os_size {
        if os_size < current {
            return Err(not_allowed("The OS disk cannot be shrunk"));
        }
    }
    os_disk.disk_size_gb = Some(os_size);
    os_disk.caching.get_or_insert(CachingTypes::ReadWrite);
    let managed = os_disk
        .managed_disk
        .get_or_insert_with(ManagedDiskParameters::default);
    managed
        .storage_account_type
        .get_or_insert(StorageAccountTypes::StandardLrs);
    if let Some(set) = &managed.disk_encryption_set {
        require_disk_encryption_set(data, &set.id)?;
    }
    vm.properties.storage_profile.os_disk = Some(os_disk);

    // Network
    let profile = vm
        .properties
        .network_profile
        .as_mut()
        .ok_or_else(|| invalid("networkProfile is required"))?;
    let network: NetworkData = lookup(data, ServiceKind::VirtualNetwork, &profile.network_id)
        .ok_or_else(|| {
            CloudApiError::bad_request(
                "InvalidResourceReference",
                format!("Virtual network {} was not found", profile.network_id),
            )
        })?;
    let address = assign_private_ip(
        data,
        &vm_id,
        existing.as_ref(),
        &network,
        &profile.subnet_name,
        profile.private_ip_allocation_method,
        profile.private_ip_address.as_deref(),
    )?;
    profile.private_ip_address = Some(address);

    // Data disks
    let disks = &mut vm.properties.storage_profile.data_disks;
    if disks.len() > size.max_data_disk_count as usize {
        return Err(not_allowed(format!(
            "Size {} supports at most {} data disks",
            size.name, size.max_data_disk_count
        )));
    }
    let mut used = BTreeSet::new();
    for lun in disks.iter().filter_map(|d| d.lun) {
        if !(0..=MAX_LUN).contains(&lun) {
            return Err(invalid(format!("LUN {} is out of range", lun)));
        }
        if !used.insert(lun) {
            return Err(invalid(format!("LUN {} is used by more than one data disk", lun)));
        }
    }
    for disk in disks.iter_mut().filter(|d| d.lun.is_none()) {
        let lun = (0..=MAX_LUN)
            .find(|l| !used.contains(l))
            .ok_or_else(|| invalid("No free LUN left"))?;
        used.insert(lun);
        disk.lun = Some(lun);
    }
    for disk in disks.iter_mut() {
        let lun = disk.lun.unwrap_or_default();
        match disk.create_option {
            DiskCreateOption::Empty => {
                let size_gb = disk
                    .disk_size_gb
                    .ok_or_else(|| invalid(format!("Data disk at LUN {} needs diskSizeGB", lun)))?;
                if !(1..=MAX_DISK_GB).contains(&size_gb) {
                    return Err(invalid(format!("Data disk size {} GB is invalid", size_gb)));
                }
                disk.name
                    .get_or_insert_with(|| format!("{}_DataDisk_{}", vm_name, lun));
                disk.managed_disk
                    .get_or_insert_with(ManagedDiskParameters::default)
                    .storage_account_type
                    .get_or_insert(StorageAccountTypes::StandardLrs);
            }
            DiskCreateOption::Attach => {
                let disk_id = disk
                    .managed_disk
                    .as_ref()
                    .and_then(|m| m.id.clone())
                    .ok_or_else(|| invalid("Attached data disks need managedDisk.id"))?;
                let source: DiskData = lookup(data, ServiceKind::Disk, &disk_id).ok_or_else(|| {
                    CloudApiError::bad_request(
                        "InvalidResourceReference",
                        format!("Disk {} was not found", disk_id),
                    )
                })?;
                if let Some(owner) = source.properties.managed_by.as_deref() {
                    if !same_id(owner, &vm_id) {
                        return Err(not_allowed(format!(
                            "Disk {} is already attached to {}",
                            disk_id, owner
                        )));
                    }
                }
                disk.disk_size_gb = source.properties.disk_size_gb;
                disk.name = source.name.clone();
                if let Some(managed) = disk.managed_disk.as_mut() {
                    managed.storage_account_type = source
                        .sku
                        .as_ref()
                        .and_then(|s| StorageAccountTypes::from_name(&s.name));
                }
            }
            DiskCreateOption::Copy | DiskCreateOption::FromImage => {
                return Err(invalid(format!(
                    "createOption {:?} is not supported for data disks",
                    disk.create_option
                )));
            }
        }
        disk.caching.get_or_insert(CachingTypes::None);
    }
    disks.sort_by_key(|d| d.lun);

    // Read-only and write-only fields
    if let Some(profile) = vm.properties.os_profile.as_mut() {
        profile.admin_password = None;
    }
    vm.properties.instance_view = Some(
        existing
            .as_ref()
            .and_then(|c| c.properties.instance_view.clone())
            .unwrap_or(InstanceView {
                power_state: PowerState::Running,
            }),
    );

    // Every check passed: move disk attachments.
    let now_attached = attached_disk_ids(&vm);
    if let Some(previous) = &existing {
        for old in attached_disk_ids(previous) {
            if !now_attached.iter().any(|n| same_id(n, &old)) {
                set_disk_attachment(data, &old, None);
            }
        }
    }
    for disk_id in &now_attached {
        set_disk_attachment(data, disk_id, Some(&vm_id));
    }
    debug!(
        "[compute] vm {} size={} data_disks={}",
        vm_name,
        size.name,
        vm.properties.storage_profile.data_disks.len()
    );
    Ok(vm)
}

/// Detaches every disk the deleted VM held.
pub fn release_vm_disks(data: &mut StoreData, vm_id: &str) {
    let held: Vec<String> = all_of::<fluentcloud_common::compute::DiskProperties>(data, ServiceKind::Disk)
        .into_iter()
        .filter(|d| {
            d.properties
                .managed_by
                .as_deref()
                .map(|owner| same_id(owner, vm_id))
                .unwrap_or(false)
        })
        .filter_map(|d| d.id)
        .collect();
    for disk_id in held {
        set_disk_attachment(data, &disk_id, None);
    }
}

pub fn vm_action(action: &str) -> ApiResult<ActionOutcome> {
    let (transitional, terminal) = match action.to_ascii_lowercase().as_str() {
        "poweroff" => (PowerState::Stopping, PowerState::Stopped),
        "start" | "restart" => (PowerState::Starting, PowerState::Running),
        "deallocate" => (PowerState::Deallocating, PowerState::Deallocated),
        _ => return Err(super::unsupported_action(ServiceKind::VirtualMachine, action)),
    };
    Ok(ActionOutcome::LongRunning {
        transitional,
        terminal,
    })
}

pub fn provision_disk(
    data: &mut StoreData,
    _id: &ResourceId,
    existing: Option<DiskData>,
    mut disk: DiskData,
) -> ApiResult<DiskData> {
    let sku_name = disk
        .sku
        .as_ref()
        .map(|s| s.name.clone())
        .unwrap_or_else(|| StorageAccountTypes::StandardLrs.as_str().to_string());
    let sku = StorageAccountTypes::from_name(&sku_name)
        .ok_or_else(|| invalid(format!("Unknown disk sku {}", sku_name)))?;
    disk.sku = Some(Sku {
        name: sku.as_str().to_string(),
        ..Sku::default()
    });

    match &existing {
        Some(current) => {
            disk.properties.creation_data = current.properties.creation_data.clone();
            disk.properties.disk_state = current.properties.disk_state;
            disk.properties.managed_by = current.properties.managed_by.clone();
            let current_size = current.properties.disk_size_gb.unwrap_or(0);
            let size = disk.properties.disk_size_gb.unwrap_or(current_size);
            if size < current_size {
                return Err(not_allowed(format!(
                    "Disk size can only be increased ({} GB requested, currently {} GB)",
                    size, current_size
                )));
            }
            disk.properties.disk_size_gb = Some(size);
        }
        None => {
            match disk.properties.creation_data.create_option {
                DiskCreateOption::Empty => {
                    if disk.properties.disk_size_gb.is_none() {
                        return Err(invalid("diskSizeGB is required for an empty disk"));
                    }
                }
                DiskCreateOption::Copy => {
                    let source_id = disk
                        .properties
                        .creation_data
                        .source_resource_id
                        .clone()
                        .ok_or_else(|| invalid("creationData.sourceResourceId is required"))?;
                    let source: DiskData = lookup(data, ServiceKind::Disk, &source_id)
                        .ok_or_else(|| {
                            CloudApiError::bad_request(
                                "InvalidResourceReference",
                                format!("Source disk {} was not found", source_id),
                            )
                        })?;
                    let source_size = source.properties.disk_size_gb.unwrap_or(0);
                    let size = disk.properties.disk_size_gb.unwrap_or(source_size);
                    if size < source_size {
                        return Err(invalid("A copy cannot be smaller than its source"));
                    }
                    disk.properties.disk_size_gb = Some(size);
                    disk.properties.os_type = source.properties.os_type;
                }
                other => {
                    return Err(invalid(format!(
                        "createOption {:?} is not supported for standalone disks",
                        other
                    )));
                }
            }
            disk.properties.disk_state = Some(DiskState::Unattached);
            disk.properties.managed_by = None;
        }
    }

    let size = disk.properties.disk_size_gb.unwrap_or(0);
    if !(1..=MAX_DISK_GB).contains(&size) {
        return Err(invalid(format!("Disk size {} GB is invalid", size)));
    }

    let encryption = disk.properties.encryption.take().unwrap_or(Encryption {
        encryption_type: EncryptionType::EncryptionAtRestWithPlatformKey,
        disk_encryption_set_id: None,
    });
    match (&encryption.encryption_type, &encryption.disk_encryption_set_id) {
        (EncryptionType::EncryptionAtRestWithPlatformKey, _) => {}
        (_, Some(set_id)) => require_disk_encryption_set(data, set_id)?,
        (_, None) => {
            return Err(invalid(
                "Customer-managed key encryption needs a diskEncryptionSetId",
            ))
        }
    }
    disk.properties.encryption = Some(encryption);
    Ok(disk)
}

pub fn check_disk_delete(data: &StoreData, id: &str) -> ApiResult<()> {
    let disk: Option<DiskData> = lookup(data, ServiceKind::Disk, id);
    match disk.and_then(|d| d.properties.managed_by) {
        Some(owner) => Err(not_allowed(format!(
            "Disk {} is attached to {} and cannot be deleted",
            id, owner
        ))),
        None => Ok(()),
    }
}

pub fn provision_disk_encryption_set(
    _data: &mut StoreData,
    _id: &ResourceId,
    existing: Option<DiskEncryptionSetData>,
    mut set: DiskEncryptionSetData,
) -> ApiResult<DiskEncryptionSetData> {
    let key = set
        .properties
        .active_key
        .as_ref()
        .ok_or_else(|| invalid("properties.activeKey is required"))?;
    if key.key_url.trim().is_empty() {
        return Err(invalid("activeKey.keyUrl is required"));
    }
    if key.source_vault.is_none() {
        return Err(invalid("activeKey.sourceVault is required"));
    }

    let identity = set
        .identity
        .take()
        .ok_or_else(|| invalid("A disk encryption set needs a managed identity"))?;
    if !identity.identity_type.eq_ignore_ascii_case("SystemAssigned") {
        return Err(invalid(format!(
            "Identity type {} is not supported",
            identity.identity_type
        )));
    }
    let previous = existing.as_ref().and_then(|e| e.identity.clone());
    set.identity = Some(ManagedIdentity {
        identity_type: "SystemAssigned".to_string(),
        principal_id: previous
            .as_ref()
            .and_then(|p| p.principal_id.clone())
            .or_else(|| Some(uuid::Uuid::new_v4().to_string())),
        tenant_id: previous
            .and_then(|p| p.tenant_id)
            .or_else(|| Some(uuid::Uuid::new_v4().to_string())),
    });

    if let Some(current) = &existing {
        // The encryption type is fixed at creation.
        set.properties.encryption_type = current.properties.encryption_type;
    }
    set.properties
        .encryption_type
        .get_or_insert(DiskEncryptionSetType::EncryptionAtRestWithCustomerKey);
    set.properties
        .rotation_to_latest_key_version_enabled
        .get_or_insert(false);
    Ok(set)
}

pub fn check_disk_encryption_set_delete(data: &StoreData, id: &str) -> ApiResult<()> {
    let in_use = all_of::<fluentcloud_common::compute::DiskProperties>(data, ServiceKind::Disk)
        .into_iter()
        .filter_map(|d| d.properties.encryption)
        .filter_map(|e| e.disk_encryption_set_id)
        .any(|set_id| same_id(&set_id, id));
    if in_use {
        return Err(CloudApiError::conflict(
            "InUseDiskEncryptionSetCannotBeDeleted",
            format!("Disk encryption set {} is still used by disks", id),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluentcloud_common::compute::{
        DataDisk, ImageReference, LinuxConfiguration, OsDisk, SubResource, VmNetworkProfile,
    };
    use fluentcloud_common::network::{NetworkProperties, Subnet};
    use fluentcloud_common::{Region, Resource};

    const SUB: &str = "sub";
    const RG: &str = "rg";

    fn rid(ns_type: &str, name: &str) -> ResourceId {
        let (ns, t) = ns_type.split_once('/').unwrap();
        ResourceId::resource(SUB, RG, ns, t, name)
    }

    fn store_with_network() -> (StoreData, String) {
        let mut data = StoreData::default();
        let id = rid("Fluent.Network/virtualNetworks", "vnet").to_string();
        let mut net: NetworkData = Resource::new(Region::US_EAST);
        net.id = Some(id.clone());
        net.resource_type = Some("Fluent.Network/virtualNetworks".to_string());
        net.properties = NetworkProperties::default();
        net.properties.address_space.address_prefixes = vec!["10.0.0.0/16".to_string()];
        net.properties.subnets = vec![Subnet {
            name: "default".to_string(),
            address_prefix: "10.0.0.0/24".to_string(),
        }];
        data.insert_resource(&id, serde_json::to_value(&net).unwrap());
        (data, id)
    }

    fn linux_vm(network_id: &str) -> VirtualMachineData {
        let mut vm: VirtualMachineData = Resource::new(Region::US_EAST);
        vm.properties.storage_profile.image_reference = Some(ImageReference {
            publisher: "Canonical".to_string(),
            offer: "UbuntuServer".to_string(),
            sku: "18.04-LTS".to_string(),
            version: "latest".to_string(),
        });
        vm.properties.storage_profile.os_disk = Some(OsDisk {
            os_type: Some(OperatingSystemTypes::Linux),
            ..OsDisk::default()
        });
        vm.properties.os_profile = Some(OsProfile {
            computer_name: None,
            admin_username: Some("azureuser".to_string()),
            admin_password: Some("S3cret!pass".to_string()),
            linux_configuration: Some(LinuxConfiguration::default()),
        });
        vm.properties.network_profile = Some(VmNetworkProfile {
            network_id: network_id.to_string(),
            subnet_name: "default".to_string(),
            private_ip_allocation_method: IpAllocationMethod::Dynamic,
            private_ip_address: None,
            public_ip_address: false,
        });
        vm
    }

    #[test]
    fn vm_gets_service_defaults() {
        let (mut data, net) = store_with_network();
        let id = rid("Fluent.Compute/virtualMachines", "vm1");
        let vm = provision_vm(&mut data, &id, None, linux_vm(&net)).unwrap();
        let os = vm.properties.storage_profile.os_disk.as_ref().unwrap();
        assert_eq!(os.disk_size_gb, Some(LINUX_OS_DISK_GB));
        assert_eq!(
            vm.properties.network_profile.unwrap().private_ip_address.as_deref(),
            Some("10.0.0.4")
        );
        assert_eq!(vm.properties.os_profile.unwrap().admin_password, None);
        assert_eq!(vm.properties.instance_view.unwrap().power_state, PowerState::Running);
    }

    #[test]
    fn static_ip_must_be_in_subnet() {
        let (mut data, net) = store_with_network();
        let mut vm = linux_vm(&net);
        if let Some(p) = vm.properties.network_profile.as_mut() {
            p.private_ip_allocation_method = IpAllocationMethod::Static;
            p.private_ip_address = Some("10.0.1.10".to_string());
        }
        let id = rid("Fluent.Compute/virtualMachines", "vm1");
        let err = provision_vm(&mut data, &id, None, vm).unwrap_err();
        assert_eq!(err.code, "PrivateIPAddressNotInSubnet");
    }

    #[test]
    fn unknown_network_is_rejected() {
        let (mut data, _) = store_with_network();
        let id = rid("Fluent.Compute/virtualMachines", "vm1");
        let missing = rid("Fluent.Network/virtualNetworks", "nope").to_string();
        let err = provision_vm(&mut data, &id, None, linux_vm(&missing)).unwrap_err();
        assert_eq!(err.code, "InvalidResourceReference");
    }

    #[test]
    fn data_disks_capped_by_size() {
        let (mut data, net) = store_with_network();
        let id = rid("Fluent.Compute/virtualMachines", "vm1");
        let empty_disk = DataDisk {
            lun: None,
            name: None,
            disk_size_gb: Some(10),
            caching: None,
            create_option: DiskCreateOption::Empty,
            managed_disk: None,
        };
        let mut vm = linux_vm(&net);
        vm.properties.vm_size = Some(VirtualMachineSizeTypes::STANDARD_A1_V2);
        vm.properties.storage_profile.data_disks = vec![empty_disk.clone(); 3];
        let err = provision_vm(&mut data, &id, None, vm.clone()).unwrap_err();
        assert_eq!(err.code, "OperationNotAllowed");

        vm.properties.storage_profile.data_disks.truncate(2);
        let created = provision_vm(&mut data, &id, None, vm).unwrap();
        assert_eq!(created.properties.storage_profile.data_disks.len(), 2);
    }

    #[test]
    fn windows_vm_needs_password_and_bigger_disk() {
        let (mut data, net) = store_with_network();
        let id = rid("Fluent.Compute/virtualMachines", "win1");
        let mut vm = linux_vm(&net);
        vm.properties.storage_profile.os_disk = Some(OsDisk {
            os_type: Some(OperatingSystemTypes::Windows),
            ..OsDisk::default()
        });
        if let Some(profile) = vm.properties.os_profile.as_mut() {
            profile.linux_configuration = None;
        }

        let mut without_password = vm.clone();
        if let Some(profile) = without_password.properties.os_profile.as_mut() {
            profile.admin_password = None;
        }
        let err = provision_vm(&mut data, &id, None, without_password).unwrap_err();
        assert_eq!(err.code, "InvalidParameter");

        let created = provision_vm(&mut data, &id, None, vm).unwrap();
        let os = created.properties.storage_profile.os_disk.unwrap();
        assert_eq!(os.disk_size_gb, Some(WINDOWS_OS_DISK_GB));
    }

    #[test]
    fn os_disk_encryption_set_must_exist() {
        let (mut data, net) = store_with_network();
        let id = rid("Fluent.Compute/virtualMachines", "vm1");
        let mut vm = linux_vm(&net);
        if let Some(os) = vm.properties.storage_profile.os_disk.as_mut() {
            os.managed_disk = Some(ManagedDiskParameters {
                disk_encryption_set: Some(SubResource::new(
                    rid("Fluent.Compute/diskEncryptionSets", "missing").to_string(),
                )),
                ..ManagedDiskParameters::default()
            });
        }
        let err = provision_vm(&mut data, &id, None, vm).unwrap_err();
        assert_eq!(err.code, "InvalidResourceReference");
    }

    #[test]
    fn disk_cannot_shrink() {
        let mut data = StoreData::default();
        let id = rid("Fluent.Compute/disks", "d1");
        let mut disk: DiskData = Resource::new(Region::US_EAST);
        disk.properties.disk_size_gb = Some(64);
        let created = provision_disk(&mut data, &id, None, disk).unwrap();
        assert_eq!(created.properties.disk_state, Some(DiskState::Unattached));
        assert_eq!(created.sku.as_ref().unwrap().name, "Standard_LRS");

        let mut smaller = created.clone();
        smaller.properties.disk_size_gb = Some(32);
        let err = provision_disk(&mut data, &id, Some(created), smaller).unwrap_err();
        assert_eq!(err.code, "OperationNotAllowed");
    }

    #[test]
    fn power_actions() {
        assert!(matches!(
            vm_action("powerOff").unwrap(),
            ActionOutcome::LongRunning { terminal: PowerState::Stopped, .. }
        ));
        assert!(vm_action("hibernate").is_err());
    }

    #[test]
    fn catalog_sizes_are_unique() {
        let names: BTreeSet<String> = vm_size_catalog().into_iter().map(|s| s.name).collect();
        assert_eq!(names.len(), vm_size_catalog().len());
        assert!(find_size("standard_a1_v2").is_some());
    }
}
