use super::{ResourceGroup, StorageAccount, fetch, remove, submit};
use crate::api::{STORAGE_API_VERSION, resource_path};
use crate::client::Client;
use crate::model::Tracked;
use async_trait::async_trait;
use leo_cloud::{Identifier, Resource, Result, Shared, ready};
use serde_json::json;
use std::sync::Arc;

/// Blob container machines publish their reports to
pub struct BlobContainer {
    client: Arc<Client>,
    identifier: String,
    resource_group: Shared<ResourceGroup>,
    storage_account: Shared<StorageAccount>,
    pub resource: Option<Tracked>,
}

impl BlobContainer {
    pub fn new(
        client: Arc<Client>,
        identifier: &Identifier,
        resource_group: Shared<ResourceGroup>,
        storage_account: Shared<StorageAccount>,
    ) -> Self {
        Self {
            client,
            identifier: identifier.long(),
            resource_group,
            storage_account,
            resource: None,
        }
    }

    async fn path(&self) -> String {
        let group = self.resource_group.read().await;
        let account = self.storage_account.read().await;
        resource_path(
            group.identifier(),
            &format!(
                "Microsoft.Storage/storageAccounts/{}/blobServices/default/containers/{}",
                account.identifier(),
                self.identifier
            ),
            STORAGE_API_VERSION,
        )
    }
}

#[async_trait]
impl Resource for BlobContainer {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn create(&mut self) -> Result<()> {
        {
            let account = self.storage_account.read().await;
            ready(&account.resource, account.identifier())?;
        }

        submit(&self.client, &self.path().await, json!({"properties": {}})).await?;
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
    use leo_cloud::shared;

    #[tokio::test]
    async fn test_lifecycle() {
        let (api, client) = fixtures::client();
        let identifier = fixtures::identifier();
        let group = fixtures::resource_group(&client).await;
        let account = shared(StorageAccount::new(
            client.clone(),
            &identifier,
            group.clone(),
        ));
        account.write().await.create().await.unwrap();

        let mut container = BlobContainer::new(client, &identifier, group, account);
        container.create().await.unwrap();
        assert!(api.contains(&container.path().await));

        container.delete().await.unwrap();
        assert!(container.resource.is_none());
        container.delete().await.unwrap();
    }
}
