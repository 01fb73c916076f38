//! Provider API consumed by the Azure resources
//!
//! Resources speak to Azure Resource Manager through this trait only. Paths
//! are Resource Manager paths relative to the management endpoint, with the
//! literal `{subscriptionId}` placeholder left for the implementation to fill.

use async_trait::async_trait;
use leo_cloud::{Operation, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const RESOURCES_API_VERSION: &str = "2021-04-01";
pub const COMPUTE_API_VERSION: &str = "2020-06-30";
pub const NETWORK_API_VERSION: &str = "2020-11-01";
pub const SCALE_SET_ADDRESSES_API_VERSION: &str = "2018-10-01";
pub const STORAGE_API_VERSION: &str = "2021-04-01";

#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Fetch an object; [`leo_cloud::CloudError::NotFound`] when it is absent
    async fn get(&self, path: &str) -> Result<Value>;

    /// Submit an idempotent create-or-update
    async fn create_or_update(&self, path: &str, body: Value) -> Result<Box<dyn Operation>>;

    /// Submit a deletion; [`leo_cloud::CloudError::NotFound`] when the
    /// object is already absent
    async fn delete(&self, path: &str) -> Result<Box<dyn Operation>>;

    /// Invoke an action such as `listKeys`
    async fn post(&self, path: &str) -> Result<Value>;

    /// Fetch one page of a collection; `path` may be a `next_link` from a
    /// previous page
    async fn list(&self, path: &str) -> Result<Page>;

    /// Contents of every blob under `prefix`, ordered by blob name
    async fn read_blobs(&self, storage: &BlobStorage, prefix: &str) -> Result<Vec<Blob>>;
}

/// One page of a Resource Manager collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(rename = "nextLink", default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

/// Where task reports are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobStorage {
    pub account: String,
    pub key: String,
    pub container: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub name: String,
    pub content: String,
}

/// `/subscriptions/{subscriptionId}/resourcegroups/<name>?api-version=...`
pub fn resource_group_path(resource_group: &str) -> String {
    format!(
        "/subscriptions/{{subscriptionId}}/resourcegroups/{}?api-version={}",
        resource_group, RESOURCES_API_VERSION
    )
}

/// Path of an object inside a resource group, e.g.
/// `Microsoft.Network/virtualNetworks/<name>`
pub fn resource_path(resource_group: &str, resource: &str, api_version: &str) -> String {
    format!(
        "/subscriptions/{{subscriptionId}}/resourceGroups/{}/providers/{}?api-version={}",
        resource_group, resource, api_version
    )
}

/// Resource Manager identifier (the path without the query string)
pub fn resource_id(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}
