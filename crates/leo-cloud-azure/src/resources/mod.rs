//! Azure resource variants
//!
//! Every variant keeps the same shape: the shared [`Client`], its provider
//! facing identifier, the attributes it was built from, non-owning handles to
//! the siblings it depends on, and `resource`, the provider handle, which is
//! `None` until a create or read succeeds and again after a delete.
//!
//! Object names derive from the task identifier alone, so read and delete
//! work in a fresh process; only create requires dependency handles.

mod blob_container;
mod credentials;
mod permission_set;
mod resource_group;
mod security_group;
mod storage_account;
mod subnet;
mod virtual_machine_scale_set;
mod virtual_network;

pub use blob_container::BlobContainer;
pub use credentials::Credentials;
pub use permission_set::PermissionSet;
pub use resource_group::ResourceGroup;
pub use security_group::SecurityGroup;
pub use storage_account::StorageAccount;
pub use subnet::Subnet;
pub use virtual_machine_scale_set::VirtualMachineScaleSet;
pub use virtual_network::VirtualNetwork;

use crate::client::Client;
use crate::model::Tracked;
use leo_cloud::{Result, ignore_not_found};
use serde_json::Value;

/// GET an object and keep its id, name and properties
async fn fetch(client: &Client, path: &str) -> Result<Tracked> {
    let value = client.api().get(path).await?;
    Ok(serde_json::from_value(value)?)
}

/// Create-or-update and wait for the provider to settle
async fn submit(client: &Client, path: &str, body: Value) -> Result<()> {
    let mut operation = client.api().create_or_update(path, body).await?;
    operation.wait().await
}

/// Delete and wait; objects already gone count as deleted
async fn remove(client: &Client, path: &str) -> Result<()> {
    let result = match client.api().delete(path).await {
        Ok(mut operation) => operation.wait().await,
        Err(e) => Err(e),
    };
    ignore_not_found(result)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::testing::FakeApi;
    use leo_cloud::{Identifier, Resource as _, Shared, shared};
    use std::sync::Arc;

    pub const PUBLIC_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5 test@leo";

    pub fn client() -> (Arc<FakeApi>, Arc<Client>) {
        let api = Arc::new(FakeApi::new());
        let client = Client::new(api.clone(), "us-east")
            .with_tags([("owner".to_string(), "tests".to_string())].into())
            .with_public_key(PUBLIC_KEY);
        (api, Arc::new(client))
    }

    pub fn identifier() -> Identifier {
        Identifier::deterministic("fixture")
    }

    pub async fn resource_group(client: &Arc<Client>) -> Shared<ResourceGroup> {
        let group = shared(ResourceGroup::new(client.clone(), &identifier()));
        group.write().await.create().await.unwrap();
        group
    }
}
