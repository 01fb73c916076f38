//! Task model
//!
//! [`Task`] is the desired state of a workload; the [`Lifecycle`] and
//! [`Observe`] traits are implemented by each provider's task assembler.

use crate::error::{CloudError, Result};
use crate::status::{Event, Status};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

/// Default maximum lifetime of a task's machines
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Desired state of a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub size: Size,
    pub environment: Environment,
    pub firewall: Firewall,
    /// Comma-separated provider identity references
    pub permission_set: String,
    pub spot: Spot,
    pub parallelism: u16,
    pub tags: BTreeMap<String, String>,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            size: Size::default(),
            environment: Environment::default(),
            firewall: Firewall::default(),
            permission_set: String::new(),
            spot: Spot::DISABLED,
            parallelism: 1,
            tags: BTreeMap::new(),
        }
    }
}

/// Machine class and disk size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Size {
    pub machine: String,
    /// Disk size in GB; 0 keeps the image default
    pub storage: i32,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            machine: "m".to_string(),
            storage: 0,
        }
    }
}

/// What runs on each machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub image: String,
    pub script: String,
    pub variables: Variables,
    pub timeout: Duration,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            image: "ubuntu".to_string(),
            script: String::new(),
            variables: Variables::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Environment variables for the task script.
///
/// A `None` value is taken from the local environment when the task is
/// created; its name may be a glob (`AWS_*`) selecting every matching local
/// variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variables(BTreeMap<String, Option<String>>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.0.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse `KEY=VALUE` (explicit value) or `KEY` (inherited) entries
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let mut variables = Self::new();
        for entry in entries {
            let entry = entry.as_ref();
            match entry.split_once('=') {
                Some((name, _)) if name.is_empty() => {
                    return Err(CloudError::InvalidInput(format!(
                        "environment variable without a name: {}",
                        entry
                    )));
                }
                Some((name, value)) => variables.insert(name, Some(value.to_string())),
                None => variables.insert(entry, None),
            }
        }
        Ok(variables)
    }

    /// Resolve every inherited variable against the local environment
    pub fn enrich(&self) -> Result<BTreeMap<String, String>> {
        self.enrich_from(std::env::vars())
    }

    fn enrich_from(
        &self,
        environment: impl Iterator<Item = (String, String)>,
    ) -> Result<BTreeMap<String, String>> {
        let environment: Vec<(String, String)> = environment.collect();
        let mut resolved = BTreeMap::new();

        for (name, value) in &self.0 {
            if let Some(value) = value {
                resolved.insert(name.clone(), value.clone());
                continue;
            }

            let pattern = glob::Pattern::new(name)
                .map_err(|e| CloudError::InvalidInput(format!("{}: {}", name, e)))?;
            for (key, value) in &environment {
                if pattern.matches(key) {
                    resolved.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(resolved)
    }
}

/// Network access rules for the task machines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Firewall {
    pub ingress: FirewallRule,
    pub egress: FirewallRule,
}

/// `None` means "provider default" for both fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirewallRule {
    /// CIDR blocks
    pub nets: Option<Vec<String>>,
    pub ports: Option<Vec<u16>>,
}

/// Spot pricing sentinel: negative disables spot instances, zero means no
/// price ceiling, positive is the maximum hourly price
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Spot(pub f64);

impl Spot {
    pub const DISABLED: Spot = Spot(-1.0);
    pub const ENABLED: Spot = Spot(0.0);

    pub fn is_enabled(&self) -> bool {
        self.0 >= 0.0
    }

    /// Price ceiling to submit to the provider, `-1` meaning "up to the
    /// on-demand price"; `None` when spot is disabled
    pub fn max_price(&self) -> Option<f64> {
        match self.0 {
            price if price < 0.0 => None,
            price if price == 0.0 => Some(-1.0),
            price => Some(price),
        }
    }
}

/// Log history of one machine; each read returns the whole history again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBlock {
    /// Stable name of the machine's log
    pub source: String,
    pub text: String,
}

/// Provisioning and teardown of a whole task
#[async_trait]
pub trait Lifecycle: Send {
    /// Create every resource in dependency order
    async fn create(&mut self) -> Result<()>;

    /// Delete every resource in reverse dependency order
    async fn delete(&mut self) -> Result<()>;
}

/// Read access used by the polling loop
#[async_trait]
pub trait Observe: Send {
    /// Refresh every resource from the provider
    async fn read(&mut self) -> Result<()>;

    /// Full log history, one block per machine, ordered by source
    async fn logs(&mut self) -> Result<Vec<LogBlock>>;

    /// Instance counts from the latest read
    async fn status(&mut self) -> Result<Status>;

    /// Provider events from the latest read
    fn events(&self) -> Vec<Event>;

    /// Public addresses from the latest read
    fn addresses(&self) -> Vec<IpAddr> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spot_sentinel() {
        assert_eq!(Spot(-1.0).max_price(), None);
        assert_eq!(Spot(0.0).max_price(), Some(-1.0));
        assert_eq!(Spot(5.0).max_price(), Some(5.0));
        assert!(!Spot::DISABLED.is_enabled());
        assert!(Spot::ENABLED.is_enabled());
    }

    #[test]
    fn test_variables_parse() {
        let variables = Variables::parse(&["A=1", "B", "C=x=y"]).unwrap();
        let resolved = variables
            .enrich_from(vec![("B".to_string(), "local".to_string())].into_iter())
            .unwrap();

        assert_eq!(resolved.get("A").map(String::as_str), Some("1"));
        assert_eq!(resolved.get("B").map(String::as_str), Some("local"));
        assert_eq!(resolved.get("C").map(String::as_str), Some("x=y"));

        assert!(Variables::parse(&["=oops"]).is_err());
    }

    #[test]
    fn test_variables_glob_enrichment() {
        let variables = Variables::parse(&["AWS_*"]).unwrap();
        let environment = vec![
            ("AWS_ACCESS_KEY_ID".to_string(), "id".to_string()),
            ("AWS_SECRET_ACCESS_KEY".to_string(), "secret".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];

        let resolved = variables.enrich_from(environment.into_iter()).unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(!resolved.contains_key("HOME"));
    }

    #[test]
    fn test_missing_inherited_variable_is_skipped() {
        temp_env::with_var_unset("LEO_TEST_UNSET_VARIABLE", || {
            let variables = Variables::parse(&["LEO_TEST_UNSET_VARIABLE"]).unwrap();
            assert!(variables.enrich().unwrap().is_empty());
        });
    }

    #[test]
    fn test_task_defaults() {
        let task = Task::default();
        assert_eq!(task.parallelism, 1);
        assert_eq!(task.environment.image, "ubuntu");
        assert!(!task.spot.is_enabled());
    }
}
