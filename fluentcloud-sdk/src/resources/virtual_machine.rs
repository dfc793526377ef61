use super::disk::Disk;
use super::network::Network;
use super::{
    group_and_name, GroupableDefinition, GroupableResource, GroupableSpec, ResourceKind,
    TaggableUpdate,
};
use crate::error::{Result, SdkError};
use crate::manager::ResourceManager;
use crate::paging::PagedList;
use crate::poller::Poller;
use fluentcloud_common::compute::{
    self, CachingTypes, DataDisk, DiskCreateOption, ImageReference, IpAllocationMethod,
    LinuxConfiguration, ManagedDiskParameters, OperatingSystemTypes, OsDisk, OsProfile,
    PowerState, SshConfiguration, SshPublicKey, StorageAccountTypes, SubResource,
    VirtualMachineData, VirtualMachineProperties, VirtualMachineSize, VirtualMachineSizeTypes,
    VmNetworkProfile,
};
use fluentcloud_common::{ProvisioningState, Region};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub const API_VERSION: &str = "2024-03-01";

pub struct VirtualMachineKind;

impl ResourceKind for VirtualMachineKind {
    const NAMESPACE: &'static str = compute::NAMESPACE;
    const TYPE: &'static str = compute::VIRTUAL_MACHINES;
    const API_VERSION: &'static str = API_VERSION;
    type Properties = VirtualMachineProperties;

    fn provisioning_state(properties: &Self::Properties) -> Option<ProvisioningState> {
        properties.provisioning_state
    }
}

/// Marketplace Linux images the builder knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownLinuxImage {
    UbuntuServer18_04Lts,
    UbuntuServer20_04Lts,
    UbuntuServer22_04Lts,
    Debian11,
    OpensuseLeap15,
    SlesSap15,
}

impl KnownLinuxImage {
    pub fn image_reference(&self) -> ImageReference {
        let (publisher, offer, sku) = match self {
            KnownLinuxImage::UbuntuServer18_04Lts => ("Canonical", "UbuntuServer", "18.04-LTS"),
            KnownLinuxImage::UbuntuServer20_04Lts => {
                ("Canonical", "0001-com-ubuntu-server-focal", "20_04-lts")
            }
            KnownLinuxImage::UbuntuServer22_04Lts => {
                ("Canonical", "0001-com-ubuntu-server-jammy", "22_04-lts")
            }
            KnownLinuxImage::Debian11 => ("Debian", "debian-11", "11"),
            KnownLinuxImage::OpensuseLeap15 => ("SUSE", "opensuse-leap-15-5", "gen2"),
            KnownLinuxImage::SlesSap15 => ("SUSE", "sles-sap-15-sp5", "gen2"),
        };
        ImageReference {
            publisher: publisher.to_string(),
            offer: offer.to_string(),
            sku: sku.to_string(),
            version: "latest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownWindowsImage {
    WindowsServer2016Datacenter,
    WindowsServer2019Datacenter,
    WindowsServer2022Datacenter,
}

impl KnownWindowsImage {
    pub fn image_reference(&self) -> ImageReference {
        let sku = match self {
            KnownWindowsImage::WindowsServer2016Datacenter => "2016-Datacenter",
            KnownWindowsImage::WindowsServer2019Datacenter => "2019-Datacenter",
            KnownWindowsImage::WindowsServer2022Datacenter => "2022-datacenter",
        };
        ImageReference {
            publisher: "MicrosoftWindowsServer".to_string(),
            offer: "WindowsServer".to_string(),
            sku: sku.to_string(),
            version: "latest".to_string(),
        }
    }
}

pub struct VirtualMachines {
    manager: ResourceManager,
}

impl VirtualMachines {
    pub(crate) fn new(manager: ResourceManager) -> Self {
        Self { manager }
    }

    pub fn define(&self, name: &str) -> VirtualMachineDefinition {
        VirtualMachineDefinition {
            manager: self.manager.clone(),
            name: name.to_string(),
            spec: GroupableSpec::default(),
            network: None,
            private_ip: PrivateIp::Dynamic,
            public_ip: false,
            image: None,
            admin_username: None,
            admin_password: None,
            ssh_keys: Vec::new(),
            computer_name: None,
            os_disk: OsDisk::default(),
            data_disks: Vec::new(),
            size: VirtualMachineSizeTypes::STANDARD_A1_V2,
        }
    }

    pub async fn get_by_resource_group(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualMachine> {
        let inner = self
            .manager
            .client::<VirtualMachineKind>()
            .get(resource_group, name)
            .await?;
        Ok(VirtualMachine::new(self.manager.clone(), inner))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<VirtualMachine> {
        let inner = self.manager.client::<VirtualMachineKind>().get_by_id(id).await?;
        Ok(VirtualMachine::new(self.manager.clone(), inner))
    }

    pub fn list_by_resource_group(
        &self,
        resource_group: &str,
    ) -> PagedList<VirtualMachineData, VirtualMachine> {
        let manager = self.manager.clone();
        self.manager.client::<VirtualMachineKind>().list(
            resource_group,
            Arc::new(move |inner| Ok(VirtualMachine::new(manager.clone(), inner))),
        )
    }

    pub async fn begin_delete_by_id(&self, id: &str) -> Result<Poller<()>> {
        self.manager
            .client::<VirtualMachineKind>()
            .begin_delete_by_id(id)
            .await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.begin_delete_by_id(id).await?.until_done().await
    }

    pub async fn delete_by_resource_group(&self, resource_group: &str, name: &str) -> Result<()> {
        self.manager
            .client::<VirtualMachineKind>()
            .begin_delete(resource_group, name)
            .await?
            .until_done()
            .await
    }

    pub fn sizes(&self) -> VirtualMachineSizes {
        VirtualMachineSizes {
            manager: self.manager.clone(),
        }
    }
}

/// Catalog of VM sizes offered per region.
pub struct VirtualMachineSizes {
    manager: ResourceManager,
}

impl VirtualMachineSizes {
    pub fn list_by_region(&self, region: impl Into<Region>) -> PagedList<VirtualMachineSize> {
        let region = region.into();
        let path = format!(
            "/subscriptions/{}/providers/{}/locations/{}/vmSizes",
            super::encode(self.manager.subscription_id()),
            compute::NAMESPACE,
            super::encode(region.name())
        );
        PagedList::new(
            self.manager.pipeline().clone(),
            API_VERSION,
            self.manager.pipeline().url(&path),
        )
    }
}

/// A virtual machine read back from the service.
#[derive(Debug, Clone)]
pub struct VirtualMachine {
    manager: ResourceManager,
    inner: VirtualMachineData,
}

impl GroupableResource for VirtualMachine {
    type Kind = VirtualMachineKind;

    fn inner(&self) -> &VirtualMachineData {
        &self.inner
    }
}

impl VirtualMachine {
    fn new(manager: ResourceManager, inner: VirtualMachineData) -> Self {
        Self { manager, inner }
    }

    pub fn size(&self) -> Option<&VirtualMachineSizeTypes> {
        self.inner.properties.vm_size.as_ref()
    }

    fn os_disk(&self) -> Option<&OsDisk> {
        self.inner.properties.storage_profile.os_disk.as_ref()
    }

    pub fn os_type(&self) -> Option<OperatingSystemTypes> {
        self.os_disk().and_then(|d| d.os_type)
    }

    /// OS disk size in GB, 0 when the service did not report one.
    pub fn os_disk_size(&self) -> i32 {
        self.os_disk().and_then(|d| d.disk_size_gb).unwrap_or(0)
    }

    pub fn os_disk_caching(&self) -> Option<CachingTypes> {
        self.os_disk().and_then(|d| d.caching)
    }

    pub fn os_disk_storage_account_type(&self) -> Option<StorageAccountTypes> {
        self.os_disk()
            .and_then(|d| d.managed_disk.as_ref())
            .and_then(|m| m.storage_account_type)
    }

    pub fn os_disk_disk_encryption_set_id(&self) -> Option<&str> {
        self.os_disk()
            .and_then(|d| d.managed_disk.as_ref())
            .and_then(|m| m.disk_encryption_set.as_ref())
            .map(|s| s.id.as_str())
    }

    pub fn image_reference(&self) -> Option<&ImageReference> {
        self.inner.properties.storage_profile.image_reference.as_ref()
    }

    /// Data disks keyed by LUN.
    pub fn data_disks(&self) -> BTreeMap<i32, DataDisk> {
        self.inner
            .properties
            .storage_profile
            .data_disks
            .iter()
            .filter_map(|d| d.lun.map(|lun| (lun, d.clone())))
            .collect()
    }

    pub fn computer_name(&self) -> Option<&str> {
        self.inner
            .properties
            .os_profile
            .as_ref()
            .and_then(|p| p.computer_name.as_deref())
    }

    pub fn admin_username(&self) -> Option<&str> {
        self.inner
            .properties
            .os_profile
            .as_ref()
            .and_then(|p| p.admin_username.as_deref())
    }

    pub fn ssh_public_keys(&self) -> Vec<&str> {
        self.inner
            .properties
            .os_profile
            .as_ref()
            .and_then(|p| p.linux_configuration.as_ref())
            .and_then(|l| l.ssh.as_ref())
            .map(|s| s.public_keys.iter().map(|k| k.key_data.as_str()).collect())
            .unwrap_or_default()
    }

    fn network_profile(&self) -> Option<&VmNetworkProfile> {
        self.inner.properties.network_profile.as_ref()
    }

    pub fn primary_network_id(&self) -> Option<&str> {
        self.network_profile().map(|n| n.network_id.as_str())
    }

    pub fn primary_subnet_name(&self) -> Option<&str> {
        self.network_profile().map(|n| n.subnet_name.as_str())
    }

    pub fn primary_private_ip(&self) -> Option<&str> {
        self.network_profile()
            .and_then(|n| n.private_ip_address.as_deref())
    }

    pub fn primary_private_ip_allocation_method(&self) -> Option<IpAllocationMethod> {
        self.network_profile().map(|n| n.private_ip_allocation_method)
    }

    pub fn has_public_ip_address(&self) -> bool {
        self.network_profile()
            .map(|n| n.public_ip_address)
            .unwrap_or(false)
    }

    pub fn power_state(&self) -> Option<PowerState> {
        self.inner
            .properties
            .instance_view
            .as_ref()
            .map(|v| v.power_state)
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let (group, name) = group_and_name(self.id())?;
        self.inner = self
            .manager
            .client::<VirtualMachineKind>()
            .get(&group, &name)
            .await?;
        Ok(())
    }

    pub fn update(&self) -> VirtualMachineUpdate {
        VirtualMachineUpdate {
            manager: self.manager.clone(),
            inner: self.inner.clone(),
        }
    }

    async fn run_action(&mut self, action: &str) -> Result<()> {
        let (group, name) = group_and_name(self.id())?;
        info!("[virtual_machines] {} {}", action, name);
        self.manager
            .client::<VirtualMachineKind>()
            .begin_action(&group, &name, action)
            .await?
            .until_done()
            .await?;
        self.refresh().await
    }

    pub async fn power_off(&mut self) -> Result<()> {
        self.run_action("powerOff").await
    }

    pub async fn start(&mut self) -> Result<()> {
        self.run_action("start").await
    }

    pub async fn restart(&mut self) -> Result<()> {
        self.run_action("restart").await
    }

    pub async fn deallocate(&mut self) -> Result<()> {
        self.run_action("deallocate").await
    }
}

#[derive(Debug, Clone)]
enum NetworkChoice {
    New { cidr: String },
    Existing { network_id: String, subnet: String },
}

#[derive(Debug, Clone)]
enum PrivateIp {
    Dynamic,
    Static(String),
}

pub struct VirtualMachineDefinition {
    manager: ResourceManager,
    name: String,
    spec: GroupableSpec,
    network: Option<NetworkChoice>,
    private_ip: PrivateIp,
    public_ip: bool,
    image: Option<(ImageReference, OperatingSystemTypes)>,
    admin_username: Option<String>,
    admin_password: Option<String>,
    ssh_keys: Vec<String>,
    computer_name: Option<String>,
    os_disk: OsDisk,
    data_disks: Vec<DataDisk>,
    size: VirtualMachineSizeTypes,
}

impl GroupableDefinition for VirtualMachineDefinition {
    fn groupable_spec(&mut self) -> &mut GroupableSpec {
        &mut self.spec
    }
}

fn new_empty_data_disk(
    size_in_gb: i32,
    lun: Option<i32>,
    caching: Option<CachingTypes>,
) -> DataDisk {
    DataDisk {
        lun,
        name: None,
        disk_size_gb: Some(size_in_gb),
        caching,
        create_option: DiskCreateOption::Empty,
        managed_disk: None,
    }
}

fn existing_data_disk(disk: &Disk) -> DataDisk {
    DataDisk {
        lun: None,
        name: Some(disk.name().to_string()),
        disk_size_gb: None,
        caching: None,
        create_option: DiskCreateOption::Attach,
        managed_disk: Some(ManagedDiskParameters {
            id: Some(disk.id().to_string()),
            ..Default::default()
        }),
    }
}

impl VirtualMachineDefinition {
    /// Creates `{vm}-vnet` with a single `default` subnet covering `cidr`.
    pub fn with_new_primary_network(mut self, cidr: &str) -> Self {
        self.network = Some(NetworkChoice::New {
            cidr: cidr.to_string(),
        });
        self
    }

    pub fn with_existing_primary_network(mut self, network: &Network, subnet: &str) -> Self {
        self.network = Some(NetworkChoice::Existing {
            network_id: network.id().to_string(),
            subnet: subnet.to_string(),
        });
        self
    }

    pub fn with_primary_private_ip_address_dynamic(mut self) -> Self {
        self.private_ip = PrivateIp::Dynamic;
        self
    }

    pub fn with_primary_private_ip_address_static(mut self, ip: &str) -> Self {
        self.private_ip = PrivateIp::Static(ip.to_string());
        self
    }

    pub fn without_primary_public_ip_address(mut self) -> Self {
        self.public_ip = false;
        self
    }

    pub fn with_new_primary_public_ip_address(mut self) -> Self {
        self.public_ip = true;
        self
    }

    pub fn with_popular_linux_image(mut self, image: KnownLinuxImage) -> Self {
        self.image = Some((image.image_reference(), OperatingSystemTypes::Linux));
        self
    }

    pub fn with_popular_windows_image(mut self, image: KnownWindowsImage) -> Self {
        self.image = Some((image.image_reference(), OperatingSystemTypes::Windows));
        self
    }

    pub fn with_specific_image(
        mut self,
        image: ImageReference,
        os_type: OperatingSystemTypes,
    ) -> Self {
        self.image = Some((image, os_type));
        self
    }

    pub fn with_root_username(mut self, username: &str) -> Self {
        self.admin_username = Some(username.to_string());
        self
    }

    pub fn with_root_password(mut self, password: &str) -> Self {
        self.admin_password = Some(password.to_string());
        self
    }

    pub fn with_admin_username(self, username: &str) -> Self {
        self.with_root_username(username)
    }

    pub fn with_admin_password(self, password: &str) -> Self {
        self.with_root_password(password)
    }

    pub fn with_ssh_public_key(mut self, key: &str) -> Self {
        self.ssh_keys.push(key.to_string());
        self
    }

    pub fn with_computer_name(mut self, name: &str) -> Self {
        self.computer_name = Some(name.to_string());
        self
    }

    pub fn with_os_disk_size_in_gb(mut self, size: i32) -> Self {
        self.os_disk.disk_size_gb = Some(size);
        self
    }

    pub fn with_os_disk_caching(mut self, caching: CachingTypes) -> Self {
        self.os_disk.caching = Some(caching);
        self
    }

    pub fn with_os_disk_storage_account_type(mut self, sku: StorageAccountTypes) -> Self {
        self.os_disk
            .managed_disk
            .get_or_insert_with(Default::default)
            .storage_account_type = Some(sku);
        self
    }

    pub fn with_os_disk_encryption_set(mut self, disk_encryption_set_id: &str) -> Self {
        self.os_disk
            .managed_disk
            .get_or_insert_with(Default::default)
            .disk_encryption_set = Some(SubResource::new(disk_encryption_set_id));
        self
    }

    /// Empty managed data disk; the service picks the lowest free LUN.
    pub fn with_new_data_disk(mut self, size_in_gb: i32) -> Self {
        self.data_disks.push(new_empty_data_disk(size_in_gb, None, None));
        self
    }

    pub fn with_new_data_disk_with_lun(
        mut self,
        size_in_gb: i32,
        lun: i32,
        caching: CachingTypes,
    ) -> Self {
        self.data_disks
            .push(new_empty_data_disk(size_in_gb, Some(lun), Some(caching)));
        self
    }

    pub fn with_existing_data_disk(mut self, disk: &Disk) -> Self {
        self.data_disks.push(existing_data_disk(disk));
        self
    }

    pub fn with_size(mut self, size: VirtualMachineSizeTypes) -> Self {
        self.size = size;
        self
    }

    fn build_os_profile(&self, os_type: OperatingSystemTypes) -> Result<OsProfile> {
        let admin_username = self
            .admin_username
            .clone()
            .ok_or(SdkError::MissingField("admin username"))?;
        let linux_configuration = match os_type {
            OperatingSystemTypes::Linux => {
                if self.admin_password.is_none() && self.ssh_keys.is_empty() {
                    return Err(SdkError::MissingField("root password or ssh key"));
                }
                Some(LinuxConfiguration {
                    disable_password_authentication: self.admin_password.is_none(),
                    ssh: (!self.ssh_keys.is_empty()).then(|| SshConfiguration {
                        public_keys: self
                            .ssh_keys
                            .iter()
                            .map(|k| SshPublicKey {
                                path: format!("/home/{}/.ssh/authorized_keys", admin_username),
                                key_data: k.clone(),
                            })
                            .collect(),
                    }),
                })
            }
            OperatingSystemTypes::Windows => {
                if self.admin_password.is_none() {
                    return Err(SdkError::MissingField("admin password"));
                }
                None
            }
        };
        Ok(OsProfile {
            computer_name: Some(self.computer_name.clone().unwrap_or_else(|| self.name.clone())),
            admin_username: Some(admin_username),
            admin_password: self.admin_password.clone(),
            linux_configuration,
        })
    }

    pub async fn begin_create(self) -> Result<Poller<VirtualMachine>> {
        let network = self
            .network
            .clone()
            .ok_or(SdkError::MissingField("primary network"))?;
        let (image, os_type) = self.image.clone().ok_or(SdkError::MissingField("image"))?;
        let os_profile = self.build_os_profile(os_type)?;

        let (region, group) = self.spec.prepare(&self.manager).await?;

        let (network_id, subnet_name) = match network {
            NetworkChoice::Existing { network_id, subnet } => (network_id, subnet),
            NetworkChoice::New { cidr } => {
                let vnet = self
                    .manager
                    .networks()
                    .define(&format!("{}-vnet", self.name))
                    .with_region(region.clone())
                    .with_existing_resource_group(&group)
                    .with_address_space(&cidr)
                    .with_subnet("default", &cidr)
                    .create()
                    .await?;
                (vnet.id().to_string(), "default".to_string())
            }
        };

        let (allocation, address) = match &self.private_ip {
            PrivateIp::Dynamic => (IpAllocationMethod::Dynamic, None),
            PrivateIp::Static(ip) => (IpAllocationMethod::Static, Some(ip.clone())),
        };

        let mut os_disk = self.os_disk.clone();
        os_disk.os_type = Some(os_type);

        let mut body: VirtualMachineData = self.spec.envelope(region);
        body.properties = VirtualMachineProperties {
            vm_size: Some(self.size.clone()),
            storage_profile: compute::StorageProfile {
                image_reference: Some(image),
                os_disk: Some(os_disk),
                data_disks: self.data_disks.clone(),
            },
            os_profile: Some(os_profile),
            network_profile: Some(VmNetworkProfile {
                network_id,
                subnet_name,
                private_ip_allocation_method: allocation,
                private_ip_address: address,
                public_ip_address: self.public_ip,
            }),
            instance_view: None,
            provisioning_state: None,
        };

        info!("[virtual_machines] creating {} in {}", self.name, group);
        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<VirtualMachineKind>()
            .begin_put(&group, &self.name, &body)
            .await?;
        Ok(poller.map(move |inner| Ok(VirtualMachine::new(manager, inner))))
    }

    pub async fn create(self) -> Result<VirtualMachine> {
        self.begin_create().await?.until_done().await
    }
}

pub struct VirtualMachineUpdate {
    manager: ResourceManager,
    inner: VirtualMachineData,
}

impl TaggableUpdate for VirtualMachineUpdate {
    fn tags_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.inner.tags
    }
}

impl VirtualMachineUpdate {
    fn data_disks_mut(&mut self) -> &mut Vec<DataDisk> {
        &mut self.inner.properties.storage_profile.data_disks
    }

    pub fn with_new_data_disk(mut self, size_in_gb: i32) -> Self {
        self.data_disks_mut()
            .push(new_empty_data_disk(size_in_gb, None, None));
        self
    }

    pub fn with_new_data_disk_with_lun(
        mut self,
        size_in_gb: i32,
        lun: i32,
        caching: CachingTypes,
    ) -> Self {
        self.data_disks_mut()
            .push(new_empty_data_disk(size_in_gb, Some(lun), Some(caching)));
        self
    }

    pub fn with_existing_data_disk(mut self, disk: &Disk) -> Self {
        self.data_disks_mut().push(existing_data_disk(disk));
        self
    }

    pub fn without_data_disk(mut self, lun: i32) -> Self {
        self.data_disks_mut().retain(|d| d.lun != Some(lun));
        self
    }

    pub fn with_size(mut self, size: VirtualMachineSizeTypes) -> Self {
        self.inner.properties.vm_size = Some(size);
        self
    }

    pub async fn begin_apply(mut self) -> Result<Poller<VirtualMachine>> {
        let (group, name) = group_and_name(self.inner.id.as_deref().unwrap_or_default())?;
        // Read-only on update.
        self.inner.properties.provisioning_state = None;
        self.inner.properties.instance_view = None;
        let manager = self.manager.clone();
        let poller = self
            .manager
            .client::<VirtualMachineKind>()
            .begin_put(&group, &name, &self.inner)
            .await?;
        Ok(poller.map(move |inner| Ok(VirtualMachine::new(manager, inner))))
    }

    pub async fn apply(self) -> Result<VirtualMachine> {
        self.begin_apply().await?.until_done().await
    }
}
