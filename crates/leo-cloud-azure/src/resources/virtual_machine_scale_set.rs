use super::{Credentials, PermissionSet, ResourceGroup, SecurityGroup, Subnet, remove, submit};
use crate::api::{COMPUTE_API_VERSION, SCALE_SET_ADDRESSES_API_VERSION, resource_path};
use crate::client::Client;
use crate::image::ImageReference;
use crate::model::{
    BillingProfile, IpConfiguration, IpConfigurationProperties, LinuxConfiguration, ManagedDisk,
    NetworkInterfaceConfiguration, NetworkInterfaceProperties, NetworkProfile, OsDisk, OsProfile,
    PublicIpAddress, PublicIpAddressConfiguration, ScaleSet, ScaleSetIdentity,
    ScaleSetInstanceView, ScaleSetProperties, Sku, SshConfiguration, SshPublicKey, StorageProfile,
    SubResource, UpgradePolicy, VirtualMachineProfile,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use leo_cloud::{
    CloudError, Environment, Event, Firewall, Identifier, Resource, Result, Shared, Size, Spot,
    Status, StatusCode, Task, ready,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Instance-view code counted as a running machine
const ACTIVE_CODE: &str = "ProvisioningState/succeeded";

#[derive(Debug, Clone)]
pub struct ScaleSetAttributes {
    pub size: Size,
    pub environment: Environment,
    pub firewall: Firewall,
    pub parallelism: u16,
    pub spot: Spot,
    pub addresses: Vec<IpAddr>,
    pub status: Status,
    pub events: Vec<Event>,
}

/// Everything the scale set settings need besides the attributes
struct Launch {
    image: ImageReference,
    machine: String,
    custom_data: String,
    public_key: String,
    subnet_id: String,
    security_group_id: String,
    identity: Option<ScaleSetIdentity>,
}

/// The machines running the task, created empty and scaled to the requested
/// parallelism by [`Resource::update`]
pub struct VirtualMachineScaleSet {
    client: Arc<Client>,
    identifier: String,
    pub attributes: ScaleSetAttributes,
    resource_group: Shared<ResourceGroup>,
    subnet: Shared<Subnet>,
    security_group: Shared<SecurityGroup>,
    permission_set: Shared<PermissionSet>,
    credentials: Shared<Credentials>,
    /// Raw Resource Manager object, so updates send back every field
    pub resource: Option<Value>,
}

impl VirtualMachineScaleSet {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<Client>,
        identifier: &Identifier,
        resource_group: Shared<ResourceGroup>,
        subnet: Shared<Subnet>,
        security_group: Shared<SecurityGroup>,
        permission_set: Shared<PermissionSet>,
        credentials: Shared<Credentials>,
        task: &Task,
    ) -> Self {
        Self {
            client,
            identifier: identifier.long(),
            attributes: ScaleSetAttributes {
                size: task.size.clone(),
                environment: task.environment.clone(),
                firewall: task.firewall.clone(),
                parallelism: task.parallelism,
                spot: task.spot,
                addresses: Vec::new(),
                status: Status::new(),
                events: Vec::new(),
            },
            resource_group,
            subnet,
            security_group,
            permission_set,
            credentials,
            resource: None,
        }
    }

    pub fn status(&self) -> &Status {
        &self.attributes.status
    }

    pub fn events(&self) -> &[Event] {
        &self.attributes.events
    }

    pub fn addresses(&self) -> &[IpAddr] {
        &self.attributes.addresses
    }

    /// Path of the scale set or of one of its sub-resources
    async fn path(&self, suffix: &str, api_version: &str) -> String {
        let group = self.resource_group.read().await;
        resource_path(
            group.identifier(),
            &format!(
                "Microsoft.Compute/virtualMachineScaleSets/{}{}",
                self.identifier, suffix
            ),
            api_version,
        )
    }

    fn settings(&self, launch: Launch) -> ScaleSet {
        let os_disk = OsDisk {
            caching: "ReadWrite".to_string(),
            create_option: "FromImage".to_string(),
            managed_disk: ManagedDisk {
                storage_account_type: "Standard_LRS".to_string(),
            },
            disk_size_gb: (self.attributes.size.storage > 0).then_some(self.attributes.size.storage),
        };

        let network_interface = NetworkInterfaceConfiguration {
            name: self.identifier.clone(),
            properties: NetworkInterfaceProperties {
                primary: true,
                network_security_group: SubResource {
                    id: launch.security_group_id,
                },
                ip_configurations: vec![IpConfiguration {
                    name: self.identifier.clone(),
                    properties: IpConfigurationProperties {
                        subnet: SubResource {
                            id: launch.subnet_id,
                        },
                        public_ip_address_configuration: PublicIpAddressConfiguration {
                            name: self.identifier.clone(),
                        },
                    },
                }],
            },
        };

        let mut profile = VirtualMachineProfile {
            storage_profile: StorageProfile {
                image_reference: launch.image.model(),
                os_disk,
            },
            os_profile: OsProfile {
                computer_name_prefix: "tpi".to_string(),
                custom_data: launch.custom_data,
                admin_username: launch.image.user.clone(),
                linux_configuration: LinuxConfiguration {
                    ssh: SshConfiguration {
                        public_keys: vec![SshPublicKey {
                            path: format!("/home/{}/.ssh/authorized_keys", launch.image.user),
                            key_data: launch.public_key,
                        }],
                    },
                },
            },
            network_profile: NetworkProfile {
                network_interface_configurations: vec![network_interface],
            },
            eviction_policy: None,
            priority: None,
            billing_profile: None,
        };

        if let Some(max_price) = self.attributes.spot.max_price() {
            profile.eviction_policy = Some("Delete".to_string());
            profile.priority = Some("Spot".to_string());
            profile.billing_profile = Some(BillingProfile { max_price });
        }

        ScaleSet {
            location: self.client.region().to_string(),
            tags: self.client.tags().clone(),
            sku: Sku {
                name: launch.machine,
                tier: "Standard".to_string(),
                capacity: 0,
            },
            plan: launch.image.purchase_plan(),
            identity: launch.identity,
            properties: ScaleSetProperties {
                upgrade_policy: UpgradePolicy {
                    mode: "Manual".to_string(),
                },
                virtual_machine_profile: profile,
            },
        }
    }

    /// Script with credentials and variables baked in, base64 encoded
    fn custom_data(&self, credentials: &BTreeMap<String, String>) -> Result<String> {
        let environment = &self.attributes.environment;
        let variables = environment.variables.enrich()?;
        let timeout = chrono::Duration::from_std(environment.timeout)
            .map_err(|e| CloudError::InvalidInput(format!("timeout: {}", e)))?;

        let script = self.client.renderer().render(
            &environment.script,
            credentials,
            &variables,
            Utc::now() + timeout,
        )?;
        Ok(STANDARD.encode(script))
    }

    async fn read_addresses(&mut self) -> Result<()> {
        let mut addresses = Vec::new();
        let mut next = Some(
            self.path("/publicipaddresses", SCALE_SET_ADDRESSES_API_VERSION)
                .await,
        );

        while let Some(path) = next {
            let page = self.client.api().list(&path).await?;
            for value in page.value {
                let address: PublicIpAddress = serde_json::from_value(value)?;
                if let Some(Ok(ip)) = address.properties.ip_address.map(|ip| ip.parse::<IpAddr>()) {
                    addresses.push(ip);
                }
            }
            next = page.next_link;
        }

        self.attributes.addresses = addresses;
        Ok(())
    }
}

#[async_trait]
impl Resource for VirtualMachineScaleSet {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn create(&mut self) -> Result<()> {
        let aliases = self.client.aliases();
        let image = ImageReference::parse(
            aliases.resolve_image(&self.attributes.environment.image),
        )?;
        let machine = aliases.resolve_machine(&self.attributes.size.machine).to_string();

        let (subnet_id, security_group_id, identity, credentials) = {
            let group = self.resource_group.read().await;
            ready(&group.resource, group.identifier())?;
            let subnet = self.subnet.read().await;
            let subnet_id = ready(&subnet.resource, subnet.identifier())?.id.clone();
            let security_group = self.security_group.read().await;
            let security_group_id = ready(&security_group.resource, security_group.identifier())?
                .id
                .clone();
            let permission_set = self.permission_set.read().await;
            ready(&permission_set.resource, permission_set.identifier())?;
            let credentials = self.credentials.read().await;
            let environment = ready(&credentials.resource, credentials.identifier())?.clone();
            (subnet_id, security_group_id, permission_set.identity(), environment)
        };

        let launch = Launch {
            image,
            machine,
            custom_data: self.custom_data(&credentials)?,
            public_key: self.client.public_key().await?,
            subnet_id,
            security_group_id,
            identity,
        };

        let settings = serde_json::to_value(self.settings(launch))?;
        submit(&self.client, &self.path("", COMPUTE_API_VERSION).await, settings).await?;
        self.read().await
    }

    async fn read(&mut self) -> Result<()> {
        let scale_set = self
            .client
            .api()
            .get(&self.path("", COMPUTE_API_VERSION).await)
            .await?;

        let view: ScaleSetInstanceView = serde_json::from_value(
            self.client
                .api()
                .get(&self.path("/instanceView", COMPUTE_API_VERSION).await)
                .await?,
        )?;

        let mut status = Status::new().with(StatusCode::Active, 0);
        for summary in view
            .virtual_machine
            .and_then(|machine| machine.statuses_summary)
            .unwrap_or_default()
        {
            let code = summary.code.unwrap_or_default();
            let count = summary.count.unwrap_or_default();
            tracing::debug!("Scale set status summary: {} {}", code, count);
            if code == ACTIVE_CODE {
                status.set(StatusCode::Active, usize::try_from(count).unwrap_or_default());
            }
        }
        self.attributes.status = status;

        self.attributes.events = view
            .statuses
            .unwrap_or_default()
            .into_iter()
            .map(|status| Event {
                time: status.time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                code: status.code.unwrap_or_default(),
                description: vec![
                    status.level.unwrap_or_default(),
                    status.display_status.unwrap_or_default(),
                    status.message.unwrap_or_default(),
                ],
            })
            .collect();

        self.read_addresses().await?;

        self.resource = Some(scale_set);
        Ok(())
    }

    async fn update(&mut self) -> Result<()> {
        self.read().await?;

        let mut scale_set = self
            .resource
            .clone()
            .ok_or_else(|| CloudError::NotFound(self.identifier.clone()))?;
        let capacity = json!(self.attributes.parallelism);
        match scale_set.pointer_mut("/sku/capacity") {
            Some(current) => *current = capacity,
            None => scale_set["sku"]["capacity"] = capacity,
        }

        submit(&self.client, &self.path("", COMPUTE_API_VERSION).await, scale_set.clone()).await?;
        self.resource = Some(scale_set);
        Ok(())
    }

    async fn delete(&mut self) -> Result<()> {
        remove(&self.client, &self.path("", COMPUTE_API_VERSION).await).await?;
        self.resource = None;
        Ok(())
    }
}
