use crate::model::ScaleSetIdentity;
use async_trait::async_trait;
use leo_cloud::{CloudError, Identifier, Resource, Result};
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

static IDENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^/subscriptions/[^/]+/resourceGroups/[^/]+/providers/Microsoft\.ManagedIdentity/userAssignedIdentities/[^/]+$",
    )
    .expect("identity pattern is valid")
});

/// User-assigned identities attached to the machines. Nothing is created on
/// the provider side; the identities must already exist.
pub struct PermissionSet {
    identifier: String,
    permission_set: String,
    /// Validated identity ids, possibly empty
    pub resource: Option<Vec<String>>,
}

impl PermissionSet {
    pub fn new(identifier: &Identifier, permission_set: &str) -> Self {
        Self {
            identifier: identifier.long(),
            permission_set: permission_set.to_string(),
            resource: None,
        }
    }

    /// Scale set identity block; `None` when no identities were requested
    pub fn identity(&self) -> Option<ScaleSetIdentity> {
        let identities = self.resource.as_ref().filter(|ids| !ids.is_empty())?;
        Some(ScaleSetIdentity {
            kind: "UserAssigned".to_string(),
            user_assigned_identities: identities.iter().map(|id| (id.clone(), json!({}))).collect(),
        })
    }
}

#[async_trait]
impl Resource for PermissionSet {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn create(&mut self) -> Result<()> {
        self.read().await
    }

    async fn read(&mut self) -> Result<()> {
        let mut identities = Vec::new();
        for id in self.permission_set.split(',').map(str::trim) {
            if id.is_empty() {
                continue;
            }
            if !IDENTITY_PATTERN.is_match(id) {
                return Err(CloudError::InvalidInput(format!(
                    "invalid user-assigned identity: {}",
                    id
                )));
            }
            identities.push(id.to_string());
        }

        self.resource = Some(identities);
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        Ok(())
    }

    async fn delete(&mut self) -> Result<()> {
        self.resource = None;
        Ok(())
    }
}
