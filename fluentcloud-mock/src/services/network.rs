use super::{all_of, same_id, ServiceKind};
use crate::error::{ApiResult, CloudApiError};
use crate::store::StoreData;
use fluentcloud_common::compute::VirtualMachineProperties;
use fluentcloud_common::network::{Ipv4Cidr, NetworkData};
use fluentcloud_common::ResourceId;
use std::collections::BTreeSet;

fn parse_prefix(prefix: &str) -> ApiResult<Ipv4Cidr> {
    Ipv4Cidr::parse(prefix).ok_or_else(|| {
        CloudApiError::bad_request(
            "InvalidAddressPrefixFormat",
            format!("'{}' is not a valid CIDR block", prefix),
        )
    })
}

/// Names of subnets in `network_id` that virtual machines are using.
fn subnets_in_use(data: &StoreData, network_id: &str) -> BTreeSet<String> {
    all_of::<VirtualMachineProperties>(data, ServiceKind::VirtualMachine)
        .into_iter()
        .filter_map(|vm| vm.properties.network_profile)
        .filter(|p| same_id(&p.network_id, network_id))
        .map(|p| p.subnet_name.to_ascii_lowercase())
        .collect()
}

pub fn provision(
    data: &mut StoreData,
    id: &ResourceId,
    existing: Option<NetworkData>,
    network: NetworkData,
) -> ApiResult<NetworkData> {
    let spaces = &network.properties.address_space.address_prefixes;
    if spaces.is_empty() {
        return Err(CloudApiError::invalid_parameter(
            "addressSpace.addressPrefixes needs at least one prefix",
        ));
    }
    let blocks = spaces
        .iter()
        .map(|p| parse_prefix(p))
        .collect::<ApiResult<Vec<_>>>()?;

    let mut names = BTreeSet::new();
    let mut placed: Vec<(String, Ipv4Cidr)> = Vec::new();
    for subnet in &network.properties.subnets {
        if !names.insert(subnet.name.to_ascii_lowercase()) {
            return Err(CloudApiError::invalid_parameter(format!(
                "Subnet name {} is used twice",
                subnet.name
            )));
        }
        let cidr = parse_prefix(&subnet.address_prefix)?;
        if !blocks.iter().any(|b| b.contains_cidr(&cidr)) {
            return Err(CloudApiError::bad_request(
                "NetcfgInvalidSubnet",
                format!(
                    "Subnet {} ({}) is not inside the address space of the network",
                    subnet.name, subnet.address_prefix
                ),
            ));
        }
        if let Some((other, _)) = placed
            .iter()
            .find(|(_, c)| c.contains_cidr(&cidr) || cidr.contains_cidr(c))
        {
            return Err(CloudApiError::bad_request(
                "NetcfgSubnetRangesOverlap",
                format!("Subnet {} overlaps subnet {}", subnet.name, other),
            ));
        }
        placed.push((subnet.name.clone(), cidr));
    }

    if existing.is_some() {
        let id = id.to_string();
        if let Some(in_use) = subnets_in_use(data, &id)
            .into_iter()
            .find(|name| !names.contains(name))
        {
            return Err(CloudApiError::bad_request(
                "InUseSubnetCannotBeDeleted",
                format!("Subnet {} is in use and cannot be removed", in_use),
            ));
        }
    }
    Ok(network)
}

pub fn check_delete(data: &StoreData, id: &str) -> ApiResult<()> {
    if subnets_in_use(data, id).is_empty() {
        Ok(())
    } else {
        Err(CloudApiError::conflict(
            "InUseNetworkCannotBeDeleted",
            format!("Virtual network {} is in use by virtual machines", id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluentcloud_common::network::Subnet;
    use fluentcloud_common::{Region, Resource};

    fn network(spaces: &[&str], subnets: &[(&str, &str)]) -> NetworkData {
        let mut net: NetworkData = Resource::new(Region::US_EAST);
        net.properties.address_space.address_prefixes =
            spaces.iter().map(|s| s.to_string()).collect();
        net.properties.subnets = subnets
            .iter()
            .map(|(n, p)| Subnet {
                name: n.to_string(),
                address_prefix: p.to_string(),
            })
            .collect();
        net
    }

    fn id() -> ResourceId {
        ResourceId::resource("s", "rg", "Fluent.Network", "virtualNetworks", "v")
    }

    #[test]
    fn subnets_must_fit_and_not_overlap() {
        let mut data = StoreData::default();
        assert!(provision(
            &mut data,
            &id(),
            None,
            network(&["10.0.0.0/16"], &[("a", "10.0.0.0/24"), ("b", "10.0.1.0/24")])
        )
        .is_ok());

        let outside = provision(
            &mut data,
            &id(),
            None,
            network(&["10.0.0.0/16"], &[("a", "10.1.0.0/24")]),
        )
        .unwrap_err();
        assert_eq!(outside.code, "NetcfgInvalidSubnet");

        let overlap = provision(
            &mut data,
            &id(),
            None,
            network(&["10.0.0.0/16"], &[("a", "10.0.0.0/23"), ("b", "10.0.1.0/24")]),
        )
        .unwrap_err();
        assert_eq!(overlap.code, "NetcfgSubnetRangesOverlap");
    }

    #[test]
    fn address_space_is_required() {
        let mut data = StoreData::default();
        let err = provision(&mut data, &id(), None, network(&[], &[])).unwrap_err();
        assert_eq!(err.code, "InvalidParameter");
        let err = provision(&mut data, &id(), None, network(&["10.0.0.0"], &[])).unwrap_err();
        assert_eq!(err.code, "InvalidAddressPrefixFormat");
    }
}
