//! az CLI wrapper
//!
//! Implements [`ProviderApi`] on top of the Azure CLI: `az rest` for Resource
//! Manager calls and `az storage blob` for task reports. Authentication is
//! whatever `az login` configured.

use crate::api::{Blob, BlobStorage, Page, ProviderApi};
use crate::error::{AzureError, Result};
use async_trait::async_trait;
use leo_cloud::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Markers `az rest` prints when Resource Manager answers 404
const NOT_FOUND_MARKERS: &[&str] = &[
    "Not Found",
    "(ResourceNotFound)",
    "(ResourceGroupNotFound)",
    "(NotFound)",
    "ContainerNotFound",
];

/// Azure CLI wrapper
#[derive(Debug, Clone)]
pub struct AzCli {
    poll_interval: Duration,
}

impl Default for AzCli {
    fn default() -> Self {
        Self::new()
    }
}

impl AzCli {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Check that az is installed and logged in
    pub async fn check_auth(&self) -> Result<AzAccount> {
        let output = self
            .run_command(&["account", "show", "--output", "json"])
            .await
            .map_err(|e| match e {
                AzureError::CommandFailed(message) => AzureError::AuthenticationFailed(message),
                other => other,
            })?;

        Ok(serde_json::from_str(&output)?)
    }

    /// Run an az command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("az");
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!("Running: az {}", args.join(" "));

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AzureError::CliNotFound,
            _ => AzureError::IoError(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if NOT_FOUND_MARKERS.iter().any(|marker| stderr.contains(marker)) {
                return Err(AzureError::ResourceNotFound(stderr));
            }
            return Err(AzureError::CommandFailed(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Resource Manager request through `az rest`
    async fn rest(&self, method: &str, url: &str, body: Option<&Value>) -> Result<Value> {
        let body = body.map(serde_json::to_string).transpose()?;
        let mut args = vec!["rest", "--method", method, "--url", url, "--output", "json"];
        if let Some(ref body) = body {
            args.push("--body");
            args.push(body.as_str());
        }

        let output = self.run_command(&args).await.map_err(|e| match e {
            AzureError::ResourceNotFound(_) => AzureError::ResourceNotFound(url.to_string()),
            other => other,
        })?;

        if output.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&output)?)
    }

    fn storage_args<'a>(storage: &'a BlobStorage) -> [&'a str; 6] {
        [
            "--account-name",
            storage.account.as_str(),
            "--account-key",
            storage.key.as_str(),
            "--container-name",
            storage.container.as_str(),
        ]
    }

    /// List blob names under `prefix`
    pub async fn list_blobs(&self, storage: &BlobStorage, prefix: &str) -> Result<Vec<String>> {
        let mut args = vec!["storage", "blob", "list", "--prefix", prefix];
        args.extend(Self::storage_args(storage));
        args.extend(["--output", "json"]);

        let output = self.run_command(&args).await?;
        if output.trim().is_empty() || output.trim() == "[]" {
            return Ok(Vec::new());
        }

        let blobs: Vec<BlobInfo> = serde_json::from_str(&output)?;
        let mut names: Vec<String> = blobs.into_iter().map(|b| b.name).collect();
        names.sort();
        Ok(names)
    }

    /// Download one blob as text
    pub async fn download_blob(&self, storage: &BlobStorage, name: &str) -> Result<String> {
        let file = tempfile::NamedTempFile::new()?;
        let path = file.path().to_string_lossy().to_string();

        let mut args = vec!["storage", "blob", "download", "--name", name, "--file"];
        args.push(path.as_str());
        args.extend(Self::storage_args(storage));
        args.extend(["--no-progress", "--output", "none"]);

        self.run_command(&args).await?;

        let content = tokio::fs::read(file.path()).await?;
        Ok(String::from_utf8_lossy(&content).to_string())
    }
}

#[async_trait]
impl ProviderApi for AzCli {
    async fn get(&self, path: &str) -> leo_cloud::Result<Value> {
        Ok(self.rest("get", path, None).await?)
    }

    async fn create_or_update(
        &self,
        path: &str,
        body: Value,
    ) -> leo_cloud::Result<Box<dyn Operation>> {
        self.rest("put", path, Some(&body)).await?;
        Ok(Box::new(AzOperation::provisioning(self.clone(), path)))
    }

    async fn delete(&self, path: &str) -> leo_cloud::Result<Box<dyn Operation>> {
        // az rest succeeds on 204 for objects that are already gone
        self.rest("get", path, None).await?;
        self.rest("delete", path, None).await?;
        Ok(Box::new(AzOperation::deletion(self.clone(), path)))
    }

    async fn post(&self, path: &str) -> leo_cloud::Result<Value> {
        Ok(self.rest("post", path, None).await?)
    }

    async fn list(&self, path: &str) -> leo_cloud::Result<Page> {
        let value = self.rest("get", path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn read_blobs(
        &self,
        storage: &BlobStorage,
        prefix: &str,
    ) -> leo_cloud::Result<Vec<Blob>> {
        let mut blobs = Vec::new();
        for name in self.list_blobs(storage, prefix).await? {
            let content = self.download_blob(storage, &name).await?;
            blobs.push(Blob { name, content });
        }
        Ok(blobs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Provisioning,
    Deletion,
}

/// Pending Resource Manager operation, resolved by polling the object
pub struct AzOperation {
    cli: AzCli,
    path: String,
    kind: OperationKind,
}

impl AzOperation {
    fn provisioning(cli: AzCli, path: &str) -> Self {
        Self {
            cli,
            path: path.to_string(),
            kind: OperationKind::Provisioning,
        }
    }

    fn deletion(cli: AzCli, path: &str) -> Self {
        Self {
            cli,
            path: path.to_string(),
            kind: OperationKind::Deletion,
        }
    }

    /// `true` once the operation has finished
    fn check(&self, response: Result<Value>) -> Result<bool> {
        match (self.kind, response) {
            (OperationKind::Deletion, Err(AzureError::ResourceNotFound(_))) => Ok(true),
            (OperationKind::Deletion, Ok(_)) => Ok(false),
            // freshly submitted objects may not be visible yet
            (OperationKind::Provisioning, Err(AzureError::ResourceNotFound(_))) => Ok(false),
            (OperationKind::Provisioning, Ok(value)) => match provisioning_state(&value) {
                None | Some("Succeeded") => Ok(true),
                Some(state @ ("Failed" | "Canceled")) => Err(AzureError::OperationFailed {
                    resource: self.path.clone(),
                    state: state.to_string(),
                }),
                Some(state) => {
                    tracing::debug!("{} is {}", self.path, state);
                    Ok(false)
                }
            },
            (_, Err(e)) => Err(e),
        }
    }
}

#[async_trait]
impl Operation for AzOperation {
    async fn wait(&mut self) -> leo_cloud::Result<()> {
        loop {
            let response = self.cli.rest("get", &self.path, None).await;
            if self.check(response)? {
                return Ok(());
            }
            tokio::time::sleep(self.cli.poll_interval).await;
        }
    }
}

fn provisioning_state(value: &Value) -> Option<&str> {
    value
        .pointer("/properties/provisioningState")
        .and_then(Value::as_str)
}

/// Output of `az account show`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzAccount {
    pub id: String,
    pub name: String,
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct BlobInfo {
    name: String,
}
