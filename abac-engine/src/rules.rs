use crate::catalog::AttributeCatalog;
use crate::error::StoreError;
use crate::store::PermissionStore;
use log::debug;
use serde::{Deserialize, Serialize};

/// Condition attached to an instance-level rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub instance_id: String,
}

/// A single compiled rule: an action on a resource type, optionally bound to
/// one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRule {
    pub action: String,
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<RuleCondition>,
}

/// The resource side of an access request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

impl ResourceRef {
    /// A request against a resource type with no particular instance
    pub fn of(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            instance_id: None,
        }
    }

    /// A request against one instance of a resource type
    pub fn instance(resource_type: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            instance_id: Some(instance_id.into()),
        }
    }
}

/// An access decision request: can the subject perform `action` on `resource`?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub action: String,
    pub resource: ResourceRef,
}

impl AccessRequest {
    pub fn new(action: impl Into<String>, resource: ResourceRef) -> Self {
        Self {
            action: action.into(),
            resource,
        }
    }
}

/// The rules compiled for one subject's roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile the rules for a set of roles.
    ///
    /// Each permission string is read as `<resource>:<actions>`; only the
    /// first two colon-separated fields count, and entries missing either
    /// side are skipped. When the catalog lists the resource type, rules are
    /// built per instance from each grant's own permission list and the
    /// declared actions are ignored for that type. Otherwise one
    /// unconditioned rule is built per `|`-separated action.
    pub async fn compile(
        roles: &[String],
        store: &dyn PermissionStore,
        catalog: &AttributeCatalog,
    ) -> Result<Self, StoreError> {
        let mut rules = Vec::new();

        for role in roles {
            for permission in store.role_permissions(role).await? {
                let mut fields = permission.split(':');
                let resource_type = fields.next().unwrap_or_default();
                let actions = fields.next().unwrap_or_default();
                if resource_type.is_empty() || actions.is_empty() {
                    debug!("Skipping malformed permission '{permission}' of role '{role}'");
                    continue;
                }

                match catalog.grants(resource_type) {
                    Some(grants) => {
                        for grant in grants {
                            for action in &grant.permissions {
                                rules.push(CompiledRule {
                                    action: action.clone(),
                                    resource_type: resource_type.to_string(),
                                    condition: Some(RuleCondition {
                                        instance_id: grant.id.clone(),
                                    }),
                                });
                            }
                        }
                    }
                    None => {
                        for action in actions.split('|').filter(|a| !a.is_empty()) {
                            rules.push(CompiledRule {
                                action: action.to_string(),
                                resource_type: resource_type.to_string(),
                                condition: None,
                            });
                        }
                    }
                }
            }
        }

        Ok(Self { rules })
    }

    /// Evaluate a request against the compiled rules.
    ///
    /// Allowed iff some rule matches the action and resource type, and is
    /// either unconditioned or bound to exactly the requested instance. A
    /// conditioned rule never matches a request without an instance id.
    pub fn can(&self, request: &AccessRequest) -> bool {
        self.rules.iter().any(|rule| {
            rule.action == request.action
                && rule.resource_type == request.resource.resource_type
                && match &rule.condition {
                    None => true,
                    Some(condition) => {
                        request.resource.instance_id.as_deref()
                            == Some(condition.instance_id.as_str())
                    }
                }
        })
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
