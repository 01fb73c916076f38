use super::{fetch, remove, submit};
use crate::api::resource_group_path;
use crate::client::Client;
use crate::model::Tracked;
use async_trait::async_trait;
use leo_cloud::{Identifier, Resource, Result};
use serde_json::json;
use std::sync::Arc;

/// Container for every other object of a task; deleting it sweeps anything
/// left behind
pub struct ResourceGroup {
    client: Arc<Client>,
    identifier: String,
    pub resource: Option<Tracked>,
}

impl ResourceGroup {
    pub fn new(client: Arc<Client>, identifier: &Identifier) -> Self {
        Self {
            client,
            identifier: identifier.long(),
            resource: None,
        }
    }

    fn path(&self) -> String {
        resource_group_path(&self.identifier)
    }
}

#[async_trait]
impl Resource for ResourceGroup {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn create(&mut self) -> Result<()> {
        let body = json!({
            "location": self.client.region(),
            "tags": self.client.tags(),
        });
        submit(&self.client, &self.path(), body).await?;
        self.read().await
    }

    async fn read(&mut self) -> Result<()> {
        self.resource = Some(fetch(&self.client, &self.path()).await?);
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        Ok(())
    }

    async fn delete(&mut self) -> Result<()> {
        remove(&self.client, &self.path()).await?;
        self.resource = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::fixtures;

    #[tokio::test]
    async fn test_lifecycle() {
        let (api, client) = fixtures::client();
        let mut group = ResourceGroup::new(client, &fixtures::identifier());

        assert!(group.read().await.unwrap_err().is_not_found());

        group.create().await.unwrap();
        let object = api.object(&group.path()).unwrap();
        assert_eq!(object["location"], "eastus");
        assert_eq!(object["tags"]["owner"], "tests");
        assert!(group.resource.is_some());

        group.delete().await.unwrap();
        assert!(group.resource.is_none());
        group.delete().await.unwrap();
    }
}
