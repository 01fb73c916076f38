//! Task assembler
//!
//! Builds the fixed resource chain for one task and drives it: creation in
//! dependency order, reads in the same order, deletion in reverse.
//!
//! ```text
//! resource group → storage account → blob container → credentials
//!               → virtual network → security group → subnet
//!               → permission set → scale set
//! ```

use crate::api::BlobStorage;
use crate::client::Client;
use crate::model::StatusReport;
use crate::resources::{
    BlobContainer, Credentials, PermissionSet, ResourceGroup, SecurityGroup, StorageAccount,
    Subnet, VirtualMachineScaleSet, VirtualNetwork,
};
use async_trait::async_trait;
use leo_cloud::{
    CloudError, Event, Identifier, Lifecycle, LogBlock, Observe, Resource, Result, Shared,
    Status, StatusCode, ignore_not_found, shared,
};
use std::net::IpAddr;
use std::sync::Arc;

const LOG_PREFIX: &str = "reports/task-";
const STATUS_PREFIX: &str = "reports/status-";

pub struct Task {
    client: Arc<Client>,
    identifier: Identifier,
    parallelism: u16,
    resource_group: Shared<ResourceGroup>,
    storage_account: Shared<StorageAccount>,
    blob_container: Shared<BlobContainer>,
    credentials: Shared<Credentials>,
    virtual_network: Shared<VirtualNetwork>,
    security_group: Shared<SecurityGroup>,
    subnet: Shared<Subnet>,
    permission_set: Shared<PermissionSet>,
    virtual_machine_scale_set: Shared<VirtualMachineScaleSet>,
    events: Vec<Event>,
    addresses: Vec<IpAddr>,
}

impl Task {
    pub fn new(client: Arc<Client>, identifier: Identifier, task: leo_cloud::Task) -> Self {
        let mut tags = client.tags().clone();
        tags.extend(task.tags.clone());
        let client = Arc::new(client.as_ref().clone().with_tags(tags));

        let resource_group = shared(ResourceGroup::new(client.clone(), &identifier));
        let storage_account = shared(StorageAccount::new(
            client.clone(),
            &identifier,
            resource_group.clone(),
        ));
        let blob_container = shared(BlobContainer::new(
            client.clone(),
            &identifier,
            resource_group.clone(),
            storage_account.clone(),
        ));
        let credentials = shared(Credentials::new(
            client.clone(),
            &identifier,
            resource_group.clone(),
            storage_account.clone(),
            blob_container.clone(),
        ));
        let virtual_network = shared(VirtualNetwork::new(
            client.clone(),
            &identifier,
            resource_group.clone(),
        ));
        let security_group = shared(SecurityGroup::new(
            client.clone(),
            &identifier,
            resource_group.clone(),
            task.firewall.clone(),
        ));
        let subnet = shared(Subnet::new(
            client.clone(),
            &identifier,
            resource_group.clone(),
            virtual_network.clone(),
            security_group.clone(),
        ));
        let permission_set = shared(PermissionSet::new(&identifier, &task.permission_set));
        let virtual_machine_scale_set = shared(VirtualMachineScaleSet::new(
            client.clone(),
            &identifier,
            resource_group.clone(),
            subnet.clone(),
            security_group.clone(),
            permission_set.clone(),
            credentials.clone(),
            &task,
        ));

        Self {
            client,
            identifier,
            parallelism: task.parallelism,
            resource_group,
            storage_account,
            blob_container,
            credentials,
            virtual_network,
            security_group,
            subnet,
            permission_set,
            virtual_machine_scale_set,
            events: Vec::new(),
            addresses: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The chain in creation order
    fn resources(&self) -> Vec<(&'static str, Shared<dyn Resource>)> {
        vec![
            ("ResourceGroup", self.resource_group.clone() as Shared<dyn Resource>),
            ("StorageAccount", self.storage_account.clone()),
            ("BlobContainer", self.blob_container.clone()),
            ("Credentials", self.credentials.clone()),
            ("VirtualNetwork", self.virtual_network.clone()),
            ("SecurityGroup", self.security_group.clone()),
            ("Subnet", self.subnet.clone()),
            ("PermissionSet", self.permission_set.clone()),
            ("VirtualMachineScaleSet", self.virtual_machine_scale_set.clone()),
        ]
    }

    /// Scale the machines to the requested parallelism
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("Starting task {}...", self.identifier);
        let mut scale_set = self.virtual_machine_scale_set.write().await;
        scale_set.attributes.parallelism = self.parallelism;
        scale_set.update().await
    }

    /// Scale the machines to zero, keeping every other resource
    pub async fn stop(&mut self) -> Result<()> {
        tracing::info!("Stopping task {}...", self.identifier);
        let mut scale_set = self.virtual_machine_scale_set.write().await;
        scale_set.attributes.parallelism = 0;
        scale_set.update().await
    }

    /// Report storage; requires a previous create or read
    async fn storage(&self) -> Result<BlobStorage> {
        let credentials = self.credentials.read().await;
        credentials
            .storage()
            .ok_or_else(|| CloudError::DependencyNotReady(credentials.identifier().to_string()))
    }
}

#[async_trait]
impl Lifecycle for Task {
    async fn create(&mut self) -> Result<()> {
        for (kind, resource) in self.resources() {
            tracing::info!("Creating {}...", kind);
            resource.write().await.create().await?;
        }
        self.start().await?;
        tracing::info!("Created task {}", self.identifier);
        Ok(())
    }

    async fn delete(&mut self) -> Result<()> {
        for (kind, resource) in self.resources().into_iter().rev() {
            tracing::info!("Deleting {}...", kind);
            ignore_not_found(resource.write().await.delete().await)?;
        }
        self.events.clear();
        self.addresses.clear();
        tracing::info!("Deleted task {}", self.identifier);
        Ok(())
    }
}

#[async_trait]
impl Observe for Task {
    async fn read(&mut self) -> Result<()> {
        for (kind, resource) in self.resources() {
            tracing::debug!("Reading {}...", kind);
            resource.write().await.read().await?;
        }

        let scale_set = self.virtual_machine_scale_set.read().await;
        self.events = scale_set.events().to_vec();
        self.addresses = scale_set.addresses().to_vec();
        Ok(())
    }

    async fn logs(&mut self) -> Result<Vec<LogBlock>> {
        let storage = self.storage().await?;
        let blobs = self.client.api().read_blobs(&storage, LOG_PREFIX).await?;
        Ok(blobs
            .into_iter()
            .map(|blob| LogBlock {
                source: blob.name,
                text: blob.content,
            })
            .collect())
    }

    async fn status(&mut self) -> Result<Status> {
        let mut status = self.virtual_machine_scale_set.read().await.status().clone();

        let storage = self.storage().await?;
        for blob in self.client.api().read_blobs(&storage, STATUS_PREFIX).await? {
            let report: StatusReport = serde_json::from_str(&blob.content)?;
            tracing::debug!("{}: exit code {}", blob.name, report.code);
            if report.code == 0 {
                status.increment(StatusCode::Succeeded);
            } else {
                status.increment(StatusCode::Failed);
            }
        }

        Ok(status)
    }

    fn events(&self) -> Vec<Event> {
        self.events.clone()
    }

    fn addresses(&self) -> Vec<IpAddr> {
        self.addresses.clone()
    }
}
