use crate::{ProvisioningState, Resource};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

pub const NAMESPACE: &str = "Fluent.Network";
pub const VIRTUAL_NETWORKS: &str = "virtualNetworks";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub name: String,
    pub address_prefix: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProperties {
    #[serde(default)]
    pub address_space: AddressSpace,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

pub type NetworkData = Resource<NetworkProperties>;

/// An IPv4 block in CIDR notation. The base address is normalized to the network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: u32,
    prefix_len: u8,
}

impl Ipv4Cidr {
    pub fn parse(raw: &str) -> Option<Self> {
        let (addr, len) = raw.trim().split_once('/')?;
        let addr: Ipv4Addr = addr.parse().ok()?;
        let prefix_len: u8 = len.parse().ok()?;
        if prefix_len > 32 {
            return None;
        }
        let mask = Self::mask(prefix_len);
        Some(Ipv4Cidr {
            network: u32::from(addr) & mask,
            prefix_len,
        })
    }

    fn mask(prefix_len: u8) -> u32 {
        if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - prefix_len as u32)
        }
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn network_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix_len as u32)
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & Self::mask(self.prefix_len) == self.network
    }

    pub fn contains_cidr(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_len >= self.prefix_len && self.contains(other.network_address())
    }

    /// Address at `offset` from the network address, if it is still inside the block.
    pub fn host(&self, offset: u32) -> Option<Ipv4Addr> {
        if offset as u64 >= self.size() {
            return None;
        }
        Some(Ipv4Addr::from(self.network + offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_normalizes_and_contains() {
        let block = Ipv4Cidr::parse("10.0.0.17/28").unwrap();
        assert_eq!(block.network_address(), Ipv4Addr::new(10, 0, 0, 16));
        assert_eq!(block.size(), 16);
        assert!(block.contains(Ipv4Addr::new(10, 0, 0, 31)));
        assert!(!block.contains(Ipv4Addr::new(10, 0, 0, 32)));
        assert_eq!(block.host(4), Some(Ipv4Addr::new(10, 0, 0, 20)));
        assert_eq!(block.host(16), None);
    }

    #[test]
    fn cidr_nesting() {
        let space = Ipv4Cidr::parse("10.0.0.0/16").unwrap();
        let subnet = Ipv4Cidr::parse("10.0.3.0/24").unwrap();
        let outside = Ipv4Cidr::parse("10.1.0.0/24").unwrap();
        assert!(space.contains_cidr(&subnet));
        assert!(!space.contains_cidr(&outside));
        assert!(!subnet.contains_cidr(&space));
    }

    #[test]
    fn cidr_rejects_garbage() {
        assert!(Ipv4Cidr::parse("10.0.0.0").is_none());
        assert!(Ipv4Cidr::parse("10.0.0.0/33").is_none());
        assert!(Ipv4Cidr::parse("not-an-ip/8").is_none());
    }
}
