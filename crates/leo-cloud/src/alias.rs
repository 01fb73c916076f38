//! Short names for machine images and machine classes
//!
//! Providers ship their own default tables; users can extend or override
//! entries from the configuration file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aliases {
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    #[serde(default)]
    pub machines: BTreeMap<String, String>,
}

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, alias: impl Into<String>, image: impl Into<String>) -> Self {
        self.images.insert(alias.into(), image.into());
        self
    }

    pub fn with_machine(mut self, alias: impl Into<String>, machine: impl Into<String>) -> Self {
        self.machines.insert(alias.into(), machine.into());
        self
    }

    /// Entries from `overrides` replace entries with the same alias
    pub fn merge(mut self, overrides: Aliases) -> Self {
        self.images.extend(overrides.images);
        self.machines.extend(overrides.machines);
        self
    }

    /// Substitute an image alias, falling back to the literal string
    pub fn resolve_image<'a>(&'a self, image: &'a str) -> &'a str {
        self.images.get(image).map(String::as_str).unwrap_or(image)
    }

    /// Substitute a machine alias, falling back to the literal string
    pub fn resolve_machine<'a>(&'a self, machine: &'a str) -> &'a str {
        self.machines.get(machine).map(String::as_str).unwrap_or(machine)
    }
}
