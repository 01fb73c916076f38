pub mod create;
pub mod delete;
pub mod read;

use leo_cloud_azure::{AzCli, Client};
use leo_config::Config;
use std::sync::Arc;

/// Settings resolved from the command line and the configuration file
pub struct Context {
    pub config: Config,
    pub region: String,
}

impl Context {
    pub fn new(config: Config, region: String) -> Self {
        Self { config, region }
    }

    /// Provider client; fails when az is missing or not logged in
    pub async fn client(&self) -> anyhow::Result<Arc<Client>> {
        let cli = AzCli::new();
        let account = cli.check_auth().await?;
        tracing::debug!("Using subscription {} ({})", account.name, account.id);

        let mut client = Client::new(Arc::new(cli), &self.region)
            .with_tags(self.config.tags.clone())
            .with_aliases(self.config.aliases.clone());
        if let Some(path) = self.config.public_key_path() {
            client = client.with_public_key_file(path);
        }

        Ok(Arc::new(client))
    }
}
