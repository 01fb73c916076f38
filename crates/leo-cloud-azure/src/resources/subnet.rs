use super::virtual_network::ADDRESS_SPACE;
use super::{ResourceGroup, SecurityGroup, VirtualNetwork, fetch, remove, submit};
use crate::api::{NETWORK_API_VERSION, resource_path};
use crate::client::Client;
use crate::model::Tracked;
use async_trait::async_trait;
use leo_cloud::{Identifier, Resource, Result, Shared, ready};
use serde_json::json;
use std::sync::Arc;

/// Single subnet spanning the whole virtual network
pub struct Subnet {
    client: Arc<Client>,
    identifier: String,
    resource_group: Shared<ResourceGroup>,
    virtual_network: Shared<VirtualNetwork>,
    security_group: Shared<SecurityGroup>,
    pub resource: Option<Tracked>,
}

impl Subnet {
    pub fn new(
        client: Arc<Client>,
        identifier: &Identifier,
        resource_group: Shared<ResourceGroup>,
        virtual_network: Shared<VirtualNetwork>,
        security_group: Shared<SecurityGroup>,
    ) -> Self {
        Self {
            client,
            identifier: identifier.long(),
            resource_group,
            virtual_network,
            security_group,
            resource: None,
        }
    }

    async fn path(&self) -> String {
        let group = self.resource_group.read().await;
        let network = self.virtual_network.read().await;
        resource_path(
            group.identifier(),
            &format!(
                "Microsoft.Network/virtualNetworks/{}/subnets/{}",
                network.identifier(),
                self.identifier
            ),
            NETWORK_API_VERSION,
        )
    }
}

#[async_trait]
impl Resource for Subnet {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn create(&mut self) -> Result<()> {
        let security_group_id = {
            let network = self.virtual_network.read().await;
            ready(&network.resource, network.identifier())?;
            let security_group = self.security_group.read().await;
            ready(&security_group.resource, security_group.identifier())?
                .id
                .clone()
        };

        let body = json!({
            "properties": {
                "addressPrefix": ADDRESS_SPACE,
                "networkSecurityGroup": {"id": security_group_id},
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::fixtures;
    use leo_cloud::{CloudError, Firewall, shared};

    #[tokio::test]
    async fn test_create_binds_security_group() {
        let (api, client) = fixtures::client();
        let identifier = fixtures::identifier();
        let group = fixtures::resource_group(&client).await;
        let network = shared(VirtualNetwork::new(client.clone(), &identifier, group.clone()));
        let security_group = shared(SecurityGroup::new(
            client.clone(),
            &identifier,
            group.clone(),
            Firewall::default(),
        ));
        network.write().await.create().await.unwrap();

        let mut subnet = Subnet::new(
            client,
            &identifier,
            group,
            network,
            security_group.clone(),
        );
        assert!(matches!(
            subnet.create().await,
            Err(CloudError::DependencyNotReady(_))
        ));

        security_group.write().await.create().await.unwrap();
        subnet.create().await.unwrap();

        let object = api.object(&subnet.path().await).unwrap();
        let security_group_id = security_group.read().await.resource.clone().unwrap().id;
        assert_eq!(
            object["properties"]["networkSecurityGroup"]["id"],
            security_group_id
        );
        assert_eq!(object["properties"]["addressPrefix"], "10.0.0.0/16");
    }
}
