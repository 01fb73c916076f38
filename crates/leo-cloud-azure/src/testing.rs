//! In-memory [`ProviderApi`] for tests

use crate::api::{Blob, BlobStorage, Page, ProviderApi, resource_id};
use async_trait::async_trait;
use leo_cloud::{CloudError, Completed, Operation, Result};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Sub-resources answered on behalf of any existing parent
const VIEWS: &[&str] = &["/instanceView", "/listKeys", "/publicipaddresses"];

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, Value>,
    views: BTreeMap<String, Value>,
    pages: BTreeMap<String, Page>,
    blobs: BTreeMap<String, String>,
    failures: BTreeMap<String, String>,
    calls: Vec<String>,
}

/// Provider API backed by maps keyed by Resource Manager id. Writes complete
/// immediately and succeed; deleting an object deletes everything below it.
#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake api state poisoned")
    }

    /// Store an object as if it had been created
    pub fn insert(&self, path: &str, value: Value) {
        self.state().objects.insert(key(path), value);
    }

    /// Answer `instanceView`/`listKeys` requests at `path`
    pub fn insert_view(&self, path: &str, value: Value) {
        self.state().views.insert(key(path), value);
    }

    /// Answer list requests at `path`; paths may be `nextLink`s
    pub fn insert_page(&self, path: &str, page: Page) {
        self.state().pages.insert(key(path), page);
    }

    pub fn insert_blob(&self, name: &str, content: &str) {
        self.state()
            .blobs
            .insert(name.to_string(), content.to_string());
    }

    /// Fail every request touching `path` with [`CloudError::Api`]
    pub fn fail(&self, path: &str, message: &str) {
        self.state()
            .failures
            .insert(key(path), message.to_string());
    }

    pub fn object(&self, path: &str) -> Option<Value> {
        self.state().objects.get(&key(path)).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.object(path).is_some()
    }

    /// Requests received so far, as `<METHOD> <id>`
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    fn record(&self, method: &str, path: &str) -> Result<String> {
        let key = key(path);
        let mut state = self.state();
        state.calls.push(format!("{} {}", method, key));
        if let Some(message) = state.failures.get(&key) {
            return Err(CloudError::Api(message.clone()));
        }
        Ok(key)
    }

    /// View payload for `key`, when its parent exists
    fn view(&self, key: &str) -> Option<Value> {
        let suffix = VIEWS.iter().find(|suffix| key.ends_with(*suffix))?;
        let parent = &key[..key.len() - suffix.len()];

        let state = self.state();
        if !state.objects.contains_key(parent) {
            return None;
        }
        Some(state.views.get(key).cloned().unwrap_or_else(|| match *suffix {
            "/listKeys" => json!({"keys": [{"keyName": "key1", "value": "fake-key"}]}),
            _ => json!({}),
        }))
    }
}

#[async_trait]
impl ProviderApi for FakeApi {
    async fn get(&self, path: &str) -> Result<Value> {
        let key = self.record("GET", path)?;
        if let Some(value) = self.state().objects.get(&key) {
            return Ok(value.clone());
        }
        self.view(&key).ok_or(CloudError::NotFound(key))
    }

    async fn create_or_update(&self, path: &str, body: Value) -> Result<Box<dyn Operation>> {
        let key = self.record("PUT", path)?;

        let mut value = body;
        if let Value::Object(object) = &mut value {
            let name = key.rsplit('/').next().unwrap_or_default().to_string();
            object.insert("id".to_string(), json!(key));
            object.insert("name".to_string(), json!(name));
            if let Some(Value::Object(properties)) = object.get_mut("properties") {
                properties.insert("provisioningState".to_string(), json!("Succeeded"));
            }
        }

        self.state().objects.insert(key, value);
        Ok(Box::new(Completed))
    }

    async fn delete(&self, path: &str) -> Result<Box<dyn Operation>> {
        let key = self.record("DELETE", path)?;

        let mut state = self.state();
        if state.objects.remove(&key).is_none() {
            return Err(CloudError::NotFound(key));
        }

        let prefix = format!("{}/", key.to_lowercase());
        state
            .objects
            .retain(|id, _| !id.to_lowercase().starts_with(&prefix));
        Ok(Box::new(Completed))
    }

    async fn post(&self, path: &str) -> Result<Value> {
        let key = self.record("POST", path)?;
        self.view(&key).ok_or(CloudError::NotFound(key))
    }

    async fn list(&self, path: &str) -> Result<Page> {
        let key = self.record("LIST", path)?;
        if let Some(page) = self.state().pages.get(&key) {
            return Ok(page.clone());
        }
        match self.view(&key) {
            Some(_) => Ok(Page::default()),
            None => Err(CloudError::NotFound(key)),
        }
    }

    async fn read_blobs(&self, _storage: &BlobStorage, prefix: &str) -> Result<Vec<Blob>> {
        Ok(self
            .state()
            .blobs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, content)| Blob {
                name: name.clone(),
                content: content.clone(),
            })
            .collect())
    }
}

fn key(path: &str) -> String {
    resource_id(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let api = FakeApi::new();
        let path = "/subscriptions/{subscriptionId}/resourcegroups/rg?api-version=1";

        api.create_or_update(path, json!({"properties": {}}))
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        let value = api.get(path).await.unwrap();
        assert_eq!(value["name"], "rg");
        assert_eq!(value["properties"]["provisioningState"], "Succeeded");

        api.delete(path).await.unwrap();
        assert!(api.get(path).await.unwrap_err().is_not_found());
        assert!(api.delete(path).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_cascades_case_insensitively() {
        let api = FakeApi::new();
        api.insert("/subscriptions/s/resourcegroups/rg", json!({}));
        api.insert(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/n",
            json!({}),
        );

        api.delete("/subscriptions/s/resourcegroups/rg").await.unwrap();
        assert!(!api.contains(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/n"
        ));
    }

    #[tokio::test]
    async fn test_views_require_parent() {
        let api = FakeApi::new();
        assert!(api.post("/a/listKeys").await.unwrap_err().is_not_found());

        api.insert("/a", json!({}));
        let keys = api.post("/a/listKeys?api-version=1").await.unwrap();
        assert_eq!(keys["keys"][0]["value"], "fake-key");
        assert!(api.list("/a/publicipaddresses").await.unwrap().value.is_empty());
    }
}
