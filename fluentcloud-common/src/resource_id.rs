use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("resource id must start with /subscriptions/: {0}")]
    MissingSubscription(String),
    #[error("resource id has no resource group: {0}")]
    MissingResourceGroup(String),
    #[error("resource id has an incomplete provider segment: {0}")]
    MalformedProvider(String),
}

/// Parsed form of `/subscriptions/{sub}/resourceGroups/{rg}[/providers/{ns}/{type}/{name}[/{type}/{name}]*]`.
///
/// Keywords are matched case-insensitively; names keep their original casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    subscription_id: String,
    resource_group: String,
    namespace: Option<String>,
    segments: Vec<(String, String)>,
}

impl ResourceId {
    pub fn resource_group(subscription_id: &str, resource_group: &str) -> Self {
        ResourceId {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            namespace: None,
            segments: Vec::new(),
        }
    }

    pub fn resource(
        subscription_id: &str,
        resource_group: &str,
        namespace: &str,
        resource_type: &str,
        name: &str,
    ) -> Self {
        ResourceId {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            namespace: Some(namespace.to_string()),
            segments: vec![(resource_type.to_string(), name.to_string())],
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ResourceIdError> {
        let parts: Vec<&str> = raw
            .trim()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() < 2 || !parts[0].eq_ignore_ascii_case("subscriptions") {
            return Err(ResourceIdError::MissingSubscription(raw.to_string()));
        }
        let subscription_id = parts[1].to_string();

        if parts.len() < 4 || !parts[2].eq_ignore_ascii_case("resourcegroups") {
            return Err(ResourceIdError::MissingResourceGroup(raw.to_string()));
        }
        let resource_group = parts[3].to_string();

        let rest = &parts[4..];
        if rest.is_empty() {
            return Ok(ResourceId::resource_group(&subscription_id, &resource_group));
        }
        if !rest[0].eq_ignore_ascii_case("providers") || rest.len() < 4 {
            return Err(ResourceIdError::MalformedProvider(raw.to_string()));
        }
        let pairs = &rest[2..];
        if pairs.len() % 2 != 0 {
            return Err(ResourceIdError::MalformedProvider(raw.to_string()));
        }

        Ok(ResourceId {
            subscription_id,
            resource_group,
            namespace: Some(rest[1].to_string()),
            segments: pairs
                .chunks(2)
                .map(|c| (c[0].to_string(), c[1].to_string()))
                .collect(),
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_resource_group(&self) -> bool {
        self.namespace.is_none()
    }

    /// Name of the innermost resource, or the resource group name for a group id.
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map(|(_, n)| n.as_str())
            .unwrap_or(&self.resource_group)
    }

    /// Full type string, e.g. `Fluent.Compute/virtualMachines`.
    pub fn resource_type(&self) -> Option<String> {
        let ns = self.namespace.as_ref()?;
        let types: Vec<&str> = self.segments.iter().map(|(t, _)| t.as_str()).collect();
        Some(format!("{}/{}", ns, types.join("/")))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )?;
        if let Some(ns) = &self.namespace {
            write!(f, "/providers/{}", ns)?;
            for (t, n) in &self.segments {
                write!(f, "/{}/{}", t, n)?;
            }
        }
        Ok(())
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_and_keeps_name_casing() {
        let id = ResourceId::parse(
            "/subscriptions/sub-1/resourcegroups/RG-One/providers/Fluent.Compute/virtualMachines/VM1",
        )
        .unwrap();
        assert_eq!(id.subscription_id(), "sub-1");
        assert_eq!(id.resource_group_name(), "RG-One");
        assert_eq!(id.name(), "VM1");
        assert_eq!(
            id.resource_type().as_deref(),
            Some("Fluent.Compute/virtualMachines")
        );
        assert_eq!(
            id.to_string(),
            "/subscriptions/sub-1/resourceGroups/RG-One/providers/Fluent.Compute/virtualMachines/VM1"
        );
    }

    #[test]
    fn parses_group_id() {
        let id: ResourceId = "/subscriptions/s/resourceGroups/rg".parse().unwrap();
        assert!(id.is_resource_group());
        assert_eq!(id.name(), "rg");
        assert_eq!(id.resource_type(), None);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(matches!(
            ResourceId::parse("/resourceGroups/rg"),
            Err(ResourceIdError::MissingSubscription(_))
        ));
        assert!(matches!(
            ResourceId::parse("/subscriptions/s"),
            Err(ResourceIdError::MissingResourceGroup(_))
        ));
        assert!(matches!(
            ResourceId::parse("/subscriptions/s/resourceGroups/rg/providers/Fluent.Compute/disks"),
            Err(ResourceIdError::MalformedProvider(_))
        ));
    }
}
