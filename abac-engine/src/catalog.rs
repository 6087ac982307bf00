use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single instance of a resource type together with the actions granted on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeGrant {
    /// Instance identifier (e.g. "dashboard-1")
    pub id: String,
    /// Actions granted on this instance
    pub permissions: Vec<String>,
}

impl AttributeGrant {
    pub fn new(id: impl Into<String>, permissions: &[&str]) -> Self {
        Self {
            id: id.into(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Per-instance grant catalog, keyed by resource type.
///
/// When a resource type appears here, rule compilation switches that type to
/// instance-level rules built from each grant's own permission list. The
/// declared action list of the role's permission string is ignored for that
/// type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCatalog {
    #[serde(flatten)]
    resources: HashMap<String, Vec<AttributeGrant>>,
}

impl AttributeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the grants for a resource type, replacing any existing entry.
    pub fn insert(&mut self, resource_type: impl Into<String>, grants: Vec<AttributeGrant>) {
        self.resources.insert(resource_type.into(), grants);
    }

    /// Grants for a resource type, or None when the type is not catalogued.
    pub fn grants(&self, resource_type: &str) -> Option<&[AttributeGrant]> {
        self.resources.get(resource_type).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
