use super::{ResourceGroup, fetch, remove, submit};
use crate::api::{NETWORK_API_VERSION, resource_path};
use crate::client::Client;
use crate::model::Tracked;
use async_trait::async_trait;
use leo_cloud::{Firewall, FirewallRule, Identifier, Resource, Result, Shared, ready};
use serde_json::{Map, Value, json};
use std::sync::Arc;

const DEFAULT_INGRESS_PORTS: &[u16] = &[22];
const FIRST_PRIORITY: u16 = 100;
const LAST_PRIORITY: u16 = 4096;

/// Network security group translating the task firewall
pub struct SecurityGroup {
    client: Arc<Client>,
    identifier: String,
    firewall: Firewall,
    resource_group: Shared<ResourceGroup>,
    pub resource: Option<Tracked>,
}

impl SecurityGroup {
    pub fn new(
        client: Arc<Client>,
        identifier: &Identifier,
        resource_group: Shared<ResourceGroup>,
        firewall: Firewall,
    ) -> Self {
        Self {
            client,
            identifier: identifier.long(),
            firewall,
            resource_group,
            resource: None,
        }
    }

    async fn path(&self) -> String {
        let group = self.resource_group.read().await;
        resource_path(
            group.identifier(),
            &format!("Microsoft.Network/networkSecurityGroups/{}", self.identifier),
            NETWORK_API_VERSION,
        )
    }
}

#[async_trait]
impl Resource for SecurityGroup {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn create(&mut self) -> Result<()> {
        {
            let group = self.resource_group.read().await;
            ready(&group.resource, group.identifier())?;
        }

        let body = json!({
            "location": self.client.region(),
            "tags": self.client.tags(),
            "properties": {"securityRules": security_rules(&self.firewall)},
        });
        submit(&self.client, &self.path().await, body).await?;
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

/// Ingress: allow the listed ports (SSH when unset) from the listed nets
/// (anywhere when unset). Egress: allow everything, or when restricted,
/// allow the listed destinations and deny the rest.
fn security_rules(firewall: &Firewall) -> Vec<Value> {
    let mut rules = Vec::new();

    let ports = firewall
        .ingress
        .ports
        .as_deref()
        .unwrap_or(DEFAULT_INGRESS_PORTS);
    if !ports.is_empty() {
        let mut properties = rule("Inbound", "Allow", FIRST_PRIORITY);
        properties.insert("destinationAddressPrefix".into(), json!("*"));
        properties.insert("destinationPortRanges".into(), port_ranges(ports));
        insert_prefixes(&mut properties, "source", &firewall.ingress);
        rules.push(named("ingress", properties));
    }

    let egress = &firewall.egress;
    if egress.nets.is_none() && egress.ports.is_none() {
        let mut properties = rule("Outbound", "Allow", FIRST_PRIORITY);
        properties.insert("destinationAddressPrefix".into(), json!("*"));
        properties.insert("destinationPortRange".into(), json!("*"));
        rules.push(named("egress", properties));
    } else {
        let mut properties = rule("Outbound", "Allow", FIRST_PRIORITY);
        insert_prefixes(&mut properties, "destination", egress);
        match egress.ports.as_deref() {
            Some(ports) => properties.insert("destinationPortRanges".into(), port_ranges(ports)),
            None => properties.insert("destinationPortRange".into(), json!("*")),
        };
        rules.push(named("egress", properties));

        let mut properties = rule("Outbound", "Deny", LAST_PRIORITY);
        properties.insert("destinationAddressPrefix".into(), json!("*"));
        properties.insert("destinationPortRange".into(), json!("*"));
        rules.push(named("egress-deny", properties));
    }

    rules
}

fn rule(direction: &str, access: &str, priority: u16) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("direction".into(), json!(direction));
    properties.insert("access".into(), json!(access));
    properties.insert("priority".into(), json!(priority));
    properties.insert("protocol".into(), json!("*"));
    properties.insert("sourcePortRange".into(), json!("*"));
    properties
}

fn named(name: &str, properties: Map<String, Value>) -> Value {
    json!({"name": name, "properties": properties})
}

fn port_ranges(ports: &[u16]) -> Value {
    json!(ports.iter().map(u16::to_string).collect::<Vec<_>>())
}

/// `<side>AddressPrefixes` from the rule's nets, or `<side>AddressPrefix: *`
fn insert_prefixes(properties: &mut Map<String, Value>, side: &str, rule: &FirewallRule) {
    match rule.nets.as_deref() {
        Some(nets) if !nets.is_empty() => {
            properties.insert(format!("{}AddressPrefixes", side), json!(nets));
        }
        _ => {
            properties.insert(format!("{}AddressPrefix", side), json!("*"));
        }
    }
}
