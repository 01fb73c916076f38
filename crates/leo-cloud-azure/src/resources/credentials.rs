use super::{BlobContainer, ResourceGroup, StorageAccount};
use crate::api::{BlobStorage, STORAGE_API_VERSION, resource_path};
use crate::client::Client;
use crate::model::StorageAccountKeys;
use async_trait::async_trait;
use leo_cloud::{CloudError, Identifier, Resource, Result, Shared, ready};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const PROVIDER_NAME: &str = "az";

/// Environment handed to the machines: storage access for reports plus the
/// task's own coordinates. Nothing is created on the provider side.
pub struct Credentials {
    client: Arc<Client>,
    identifier: String,
    resource_group: Shared<ResourceGroup>,
    storage_account: Shared<StorageAccount>,
    blob_container: Shared<BlobContainer>,
    pub resource: Option<BTreeMap<String, String>>,
}

impl Credentials {
    pub fn new(
        client: Arc<Client>,
        identifier: &Identifier,
        resource_group: Shared<ResourceGroup>,
        storage_account: Shared<StorageAccount>,
        blob_container: Shared<BlobContainer>,
    ) -> Self {
        Self {
            client,
            identifier: identifier.long(),
            resource_group,
            storage_account,
            blob_container,
            resource: None,
        }
    }

    /// Report storage location, once read
    pub fn storage(&self) -> Option<BlobStorage> {
        let resource = self.resource.as_ref()?;
        Some(BlobStorage {
            account: resource.get("AZURE_STORAGE_ACCOUNT")?.clone(),
            key: resource.get("AZURE_STORAGE_KEY")?.clone(),
            container: resource.get("AZURE_STORAGE_CONTAINER")?.clone(),
        })
    }
}

#[async_trait]
impl Resource for Credentials {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn create(&mut self) -> Result<()> {
        {
            let account = self.storage_account.read().await;
            ready(&account.resource, account.identifier())?;
            let container = self.blob_container.read().await;
            ready(&container.resource, container.identifier())?;
        }
        self.read().await
    }

    async fn read(&mut self) -> Result<()> {
        let group = self.resource_group.read().await.identifier().to_string();
        let account = self.storage_account.read().await.identifier().to_string();
        let container = self.blob_container.read().await.identifier().to_string();

        let path = resource_path(
            &group,
            &format!("Microsoft.Storage/storageAccounts/{}/listKeys", account),
            STORAGE_API_VERSION,
        );
        let keys: StorageAccountKeys = serde_json::from_value(self.client.api().post(&path).await?)?;
        let key = keys
            .keys
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::Api(format!("storage account {} has no keys", account)))?
            .value;

        let remote = format!(
            ":azureblob,account='{}',key='{}':{}",
            account, key, container
        );

        self.resource = Some(BTreeMap::from([
            ("AZURE_STORAGE_ACCOUNT".to_string(), account),
            ("AZURE_STORAGE_KEY".to_string(), key),
            ("AZURE_STORAGE_CONTAINER".to_string(), container),
            ("RCLONE_REMOTE".to_string(), remote),
            ("TPI_TASK_CLOUD_PROVIDER".to_string(), PROVIDER_NAME.to_string()),
            (
                "TPI_TASK_CLOUD_REGION".to_string(),
                self.client.region().to_string(),
            ),
            ("TPI_TASK_IDENTIFIER".to_string(), self.identifier.clone()),
        ]));
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
