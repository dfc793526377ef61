//! Fluent client for the fluentcloud resource-management API.
//!
//! ```no_run
//! use fluentcloud_sdk::prelude::*;
//! use fluentcloud_sdk::models::Region;
//!
//! # async fn demo() -> fluentcloud_sdk::Result<()> {
//! let manager = ResourceManager::from_env()?;
//! let network = manager
//!     .networks()
//!     .define("vnet1")
//!     .with_region(Region::US_EAST)
//!     .with_new_resource_group("rg1")
//!     .with_address_space("10.0.0.0/16")
//!     .with_subnet("default", "10.0.0.0/24")
//!     .create()
//!     .await?;
//! println!("{}", network.id());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credential;
pub mod error;
pub mod manager;
pub mod paging;
pub mod pipeline;
pub mod poller;
pub mod resources;

pub use fluentcloud_common as models;

pub use config::ClientSettings;
pub use credential::{AccessToken, StaticTokenCredential, TokenCredential};
pub use error::{Result, SdkError};
pub use manager::ResourceManager;
pub use paging::PagedList;
pub use poller::{PollStatus, Poller};

pub mod prelude {
    pub use crate::manager::ResourceManager;
    pub use crate::resources::kubernetes_cluster::AgentPoolParent;
    pub use crate::resources::{GroupableDefinition, GroupableResource, TaggableUpdate};
}
