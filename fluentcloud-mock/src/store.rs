//! In-memory state of the mock cloud. Everything sits behind one lock so that
//! cross-resource checks (disk attachment, subnet usage) see a consistent view.

use crate::lro::Operation;
use fluentcloud_common::cache::RedisAccessKeys;
use fluentcloud_common::ResourceGroupData;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Ids and group names are case-insensitive on the wire.
pub fn key(raw: &str) -> String {
    raw.to_ascii_lowercase()
}

#[derive(Debug, Default)]
pub struct StoreData {
    pub groups: BTreeMap<String, ResourceGroupData>,
    pub resources: BTreeMap<String, Value>,
    pub redis_keys: BTreeMap<String, RedisAccessKeys>,
    pub operations: HashMap<String, Operation>,
}

impl StoreData {
    pub fn group(&self, name: &str) -> Option<&ResourceGroupData> {
        self.groups.get(&key(name))
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut ResourceGroupData> {
        self.groups.get_mut(&key(name))
    }

    pub fn resource(&self, id: &str) -> Option<&Value> {
        self.resources.get(&key(id))
    }

    pub fn resource_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.resources.get_mut(&key(id))
    }

    pub fn insert_resource(&mut self, id: &str, value: Value) {
        self.resources.insert(key(id), value);
    }

    pub fn remove_resource(&mut self, id: &str) -> Option<Value> {
        self.redis_keys.remove(&key(id));
        self.resources.remove(&key(id))
    }

    /// Resources of `full_type` ("Ns/type"), optionally restricted to one group, in id order.
    pub fn resources_of_type(&self, group: Option<&str>, full_type: &str) -> Vec<Value> {
        let group_prefix = group.map(|g| format!("/resourcegroups/{}/", key(g)));
        self.resources
            .iter()
            .filter(|(k, _)| match &group_prefix {
                Some(prefix) => k.contains(prefix.as_str()),
                None => true,
            })
            .filter(|(_, v)| {
                v.get("type")
                    .and_then(|t| t.as_str())
                    .map(|t| t.eq_ignore_ascii_case(full_type))
                    .unwrap_or(false)
            })
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Removes a group and every resource inside it.
    pub fn remove_group_cascade(&mut self, name: &str) -> usize {
        let prefix = format!("/resourcegroups/{}/", key(name));
        let doomed: Vec<String> = self
            .resources
            .keys()
            .filter(|k| k.contains(&prefix))
            .cloned()
            .collect();
        for id in &doomed {
            self.remove_resource(id);
        }
        self.groups.remove(&key(name));
        doomed.len()
    }
}

#[derive(Debug, Default)]
pub struct Store {
    inner: RwLock<StoreData>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, StoreData> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.inner.write().await
    }
}
