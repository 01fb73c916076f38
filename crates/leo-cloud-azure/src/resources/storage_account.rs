use super::{ResourceGroup, fetch, remove, submit};
use crate::api::{STORAGE_API_VERSION, resource_path};
use crate::client::Client;
use crate::model::Tracked;
use async_trait::async_trait;
use leo_cloud::{Identifier, Resource, Result, Shared, ready};
use serde_json::json;
use std::sync::Arc;

/// Holds the report container; named with the short identifier since account
/// names are limited to 24 lowercase alphanumerics
pub struct StorageAccount {
    client: Arc<Client>,
    identifier: String,
    resource_group: Shared<ResourceGroup>,
    pub resource: Option<Tracked>,
}

impl StorageAccount {
    pub fn new(
        client: Arc<Client>,
        identifier: &Identifier,
        resource_group: Shared<ResourceGroup>,
    ) -> Self {
        Self {
            client,
            identifier: identifier.short(),
            resource_group,
            resource: None,
        }
    }

    async fn path(&self) -> String {
        let group = self.resource_group.read().await;
        resource_path(
            group.identifier(),
            &format!("Microsoft.Storage/storageAccounts/{}", self.identifier),
            STORAGE_API_VERSION,
        )
    }
}

#[async_trait]
impl Resource for StorageAccount {
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
            "kind": "StorageV2",
            "sku": {"name": "Standard_LRS"},
            "properties": {},
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
    use leo_cloud::{CloudError, shared};

    #[tokio::test]
    async fn test_create_requires_resource_group() {
        let (api, client) = fixtures::client();
        let identifier = fixtures::identifier();
        let group = shared(ResourceGroup::new(client.clone(), &identifier));
        let mut account = StorageAccount::new(client, &identifier, group);

        assert!(matches!(
            account.create().await,
            Err(CloudError::DependencyNotReady(name)) if name == identifier.long()
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_named_with_short_identifier() {
        let (api, client) = fixtures::client();
        let group = fixtures::resource_group(&client).await;
        let mut account = StorageAccount::new(client, &fixtures::identifier(), group);

        account.create().await.unwrap();
        assert_eq!(account.identifier(), fixtures::identifier().short());

        let object = api.object(&account.path().await).unwrap();
        assert_eq!(object["kind"], "StorageV2");
        assert_eq!(object["sku"]["name"], "Standard_LRS");
    }
}
