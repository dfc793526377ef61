use crate::config::ClientSettings;
use crate::credential::{StaticTokenCredential, TokenCredential};
use crate::error::Result;
use crate::pipeline::HttpPipeline;
use crate::resources::disk::Disks;
use crate::resources::disk_encryption_set::DiskEncryptionSets;
use crate::resources::kubernetes_cluster::KubernetesClusters;
use crate::resources::network::Networks;
use crate::resources::redis_cache::RedisCaches;
use crate::resources::resource_group::ResourceGroups;
use crate::resources::virtual_machine::VirtualMachines;
use crate::resources::{ResourceClient, ResourceKind};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Entry point of the fluent API. Cheap to clone.
#[derive(Clone)]
pub struct ResourceManager {
    pipeline: HttpPipeline,
    subscription_id: String,
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("endpoint", &self.pipeline.settings().endpoint)
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

impl ResourceManager {
    /// Builds a manager authenticating with the settings' static bearer token.
    pub fn authenticate(settings: ClientSettings) -> Result<Self> {
        settings.validate()?;
        let credential = Arc::new(StaticTokenCredential::new(settings.token.clone()));
        Self::with_credential(settings, credential)
    }

    pub fn with_credential(
        settings: ClientSettings,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self> {
        settings.validate()?;
        let subscription_id = settings.subscription_id.clone();
        info!(
            "[manager] endpoint={} subscription={}",
            settings.endpoint, subscription_id
        );
        let pipeline = HttpPipeline::new(settings, credential)?;
        Ok(Self {
            pipeline,
            subscription_id,
        })
    }

    /// Convenience for `ClientSettings::from_env()` + `authenticate`.
    pub fn from_env() -> Result<Self> {
        Self::authenticate(ClientSettings::from_env()?)
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn pipeline(&self) -> &HttpPipeline {
        &self.pipeline
    }

    pub fn resource_groups(&self) -> ResourceGroups {
        ResourceGroups::new(self.clone())
    }

    pub fn virtual_machines(&self) -> VirtualMachines {
        VirtualMachines::new(self.clone())
    }

    pub fn disks(&self) -> Disks {
        Disks::new(self.clone())
    }

    pub fn disk_encryption_sets(&self) -> DiskEncryptionSets {
        DiskEncryptionSets::new(self.clone())
    }

    pub fn networks(&self) -> Networks {
        Networks::new(self.clone())
    }

    pub fn redis_caches(&self) -> RedisCaches {
        RedisCaches::new(self.clone())
    }

    pub fn kubernetes_clusters(&self) -> KubernetesClusters {
        KubernetesClusters::new(self.clone())
    }

    pub(crate) fn client<K: ResourceKind>(&self) -> ResourceClient<K> {
        ResourceClient::new(self.pipeline.clone(), &self.subscription_id)
    }
}
