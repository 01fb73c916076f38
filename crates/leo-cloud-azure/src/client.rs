//! Shared handle passed to every Azure resource

use crate::api::ProviderApi;
use crate::image::azure_aliases;
use leo_cloud::{Aliases, CloudError, MachineScript, Result, ScriptRenderer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Friendly region names accepted besides native Azure locations
const REGIONS: &[(&str, &str)] = &[
    ("us-east", "eastus"),
    ("us-west", "westus2"),
    ("eu-north", "northeurope"),
    ("eu-west", "westeurope"),
];

#[derive(Debug, Clone)]
enum PublicKey {
    Inline(String),
    File(PathBuf),
}

#[derive(Clone)]
pub struct Client {
    api: Arc<dyn ProviderApi>,
    region: String,
    tags: BTreeMap<String, String>,
    aliases: Aliases,
    renderer: Arc<dyn ScriptRenderer>,
    public_key: Option<PublicKey>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("region", &self.region)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(api: Arc<dyn ProviderApi>, region: &str) -> Self {
        Self {
            api,
            region: resolve_region(region).to_string(),
            tags: BTreeMap::new(),
            aliases: azure_aliases(),
            renderer: Arc::new(MachineScript),
            public_key: None,
        }
    }

    /// Tags applied to every created object
    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Merge user aliases over the built-in tables
    pub fn with_aliases(mut self, aliases: Aliases) -> Self {
        self.aliases = self.aliases.merge(aliases);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ScriptRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = Some(PublicKey::Inline(key.into()));
        self
    }

    pub fn with_public_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.public_key = Some(PublicKey::File(path.into()));
        self
    }

    pub fn api(&self) -> &dyn ProviderApi {
        self.api.as_ref()
    }

    /// Azure location
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn aliases(&self) -> &Aliases {
        &self.aliases
    }

    pub fn renderer(&self) -> &dyn ScriptRenderer {
        self.renderer.as_ref()
    }

    /// SSH public key installed for the image's login user
    pub async fn public_key(&self) -> Result<String> {
        match &self.public_key {
            Some(PublicKey::Inline(key)) => Ok(key.trim().to_string()),
            Some(PublicKey::File(path)) => {
                let key = tokio::fs::read_to_string(path).await?;
                Ok(key.trim().to_string())
            }
            None => Err(CloudError::InvalidInput(
                "no SSH public key configured".to_string(),
            )),
        }
    }
}

/// Map a friendly region name to its Azure location; anything else is
/// passed through
pub fn resolve_region(region: &str) -> &str {
    REGIONS
        .iter()
        .find(|(alias, _)| *alias == region)
        .map(|(_, location)| *location)
        .unwrap_or(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use std::io::Write;

    #[test]
    fn test_resolve_region() {
        assert_eq!(resolve_region("us-east"), "eastus");
        assert_eq!(resolve_region("eu-west"), "westeurope");
        assert_eq!(resolve_region("japaneast"), "japaneast");
    }

    #[tokio::test]
    async fn test_public_key_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ssh-ed25519 AAAA user@host").unwrap();

        let client = Client::new(Arc::new(FakeApi::new()), "us-west")
            .with_public_key_file(file.path());
        assert_eq!(client.region(), "westus2");
        assert_eq!(client.public_key().await.unwrap(), "ssh-ed25519 AAAA user@host");
    }

    #[tokio::test]
    async fn test_missing_public_key() {
        let client = Client::new(Arc::new(FakeApi::new()), "eastus");
        assert!(matches!(
            client.public_key().await,
            Err(CloudError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_user_aliases_override_defaults() {
        let client = Client::new(Arc::new(FakeApi::new()), "eastus")
            .with_aliases(Aliases::new().with_machine("m", "Standard_D8s_v3"));
        assert_eq!(client.aliases().resolve_machine("m"), "Standard_D8s_v3");
        assert_eq!(client.aliases().resolve_machine("s"), "Standard_B1s");
    }
}
