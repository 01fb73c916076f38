use super::{ResourceGroup, fetch, remove, submit};
use crate::api::{NETWORK_API_VERSION, resource_path};
use crate::client::Client;
use crate::model::Tracked;
use async_trait::async_trait;
use leo_cloud::{Identifier, Resource, Result, Shared, ready};
use serde_json::json;
use std::sync::Arc;

pub const ADDRESS_SPACE: &str = "10.0.0.0/16";

pub struct VirtualNetwork {
    client: Arc<Client>,
    identifier: String,
    resource_group: Shared<ResourceGroup>,
    pub resource: Option<Tracked>,
}

impl VirtualNetwork {
    pub fn new(
        client: Arc<Client>,
        identifier: &Identifier,
        resource_group: Shared<ResourceGroup>,
    ) -> Self {
        Self {
            client,
            identifier: identifier.long(),
            resource_group,
            resource: None,
        }
    }

    async fn path(&self) -> String {
        let group = self.resource_group.read().await;
        resource_path(
            group.identifier(),
            &format!("Microsoft.Network/virtualNetworks/{}", self.identifier),
            NETWORK_API_VERSION,
        )
    }
}

#[async_trait]
impl Resource for VirtualNetwork {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn create(&mut self) -> Result<()> {
        {
            let group = self.resource_group.read().await;
            ready(&group.resource, group.identifier())?;
        }

        let body = json!({
            "location": self.client.region(),
            "tags": self.client.tags(),
            "properties": {
                "addressSpace": {"addressPrefixes": [ADDRESS_SPACE]},
            },
        });
        submit(&self.client, &self.path().await, body).await?;
        self.read().await
    }

    async fn read(&mut self) -> Result<()> {
        self.resource = Some(fetch(&self.client, &self.path().await).await?);
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        Ok(())
    }

    async fn delete(&mut self) -> Result<()> {
        remove(&self.client, &self.path().await).await?;
        self.resource = None;
        Ok(())
    }
}
