//! Task identifiers
//!
//! An identifier names a task and every provider-side object that belongs to
//! it. Its shape is `tpi-<name>-<random>-<hash>`, where the hash covers the
//! name and the random part so that a mistyped identifier is rejected before
//! any provider call is made.

use crate::error::{CloudError, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

const PREFIX: &str = "tpi";
const MAX_NAME_LENGTH: usize = 24;
const PART_LENGTH: usize = 8;
const FALLBACK_NAME: &str = "task";

static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^tpi-([a-z0-9]+(?:[a-z0-9-]*[a-z0-9])?)-([a-z0-9]{8})-([a-z0-9]{8})$")
        .expect("identifier pattern is valid")
});

/// Validated task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    name: String,
    random: String,
    hash: String,
}

impl Identifier {
    /// Generate a fresh identifier for a new task
    pub fn new(name: &str) -> Self {
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self::assemble(normalize(name), random[..PART_LENGTH].to_string())
    }

    /// Derive an identifier from the name alone; the same name always
    /// yields the same identifier
    pub fn deterministic(name: &str) -> Self {
        let name = normalize(name);
        let random = digest(&name)[..PART_LENGTH].to_string();
        Self::assemble(name, random)
    }

    /// Parse and verify an identifier previously produced by [`Identifier::new`]
    /// or [`Identifier::deterministic`]
    pub fn parse(identifier: &str) -> Result<Self> {
        let captures = IDENTIFIER_PATTERN
            .captures(identifier)
            .ok_or_else(|| CloudError::InvalidIdentifier(identifier.to_string()))?;

        let parsed = Self::assemble(captures[1].to_string(), captures[2].to_string());
        if parsed.hash != captures[3] {
            return Err(CloudError::InvalidIdentifier(identifier.to_string()));
        }

        Ok(parsed)
    }

    fn assemble(name: String, random: String) -> Self {
        let hash = digest(&format!("{}{}", name, random))[..PART_LENGTH].to_string();
        Self { name, random, hash }
    }

    /// Normalized user-facing name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full identifier, used to name most provider resources
    pub fn long(&self) -> String {
        format!("{}-{}-{}-{}", PREFIX, self.name, self.random, self.hash)
    }

    /// 16 lowercase alphanumerics, for resources with strict naming rules
    /// (storage accounts)
    pub fn short(&self) -> String {
        format!("{}{}", self.random, self.hash)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.long())
    }
}

impl FromStr for Identifier {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn digest(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

fn normalize(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            normalized.push(c);
        } else if !normalized.ends_with('-') {
            normalized.push('-');
        }
    }

    let normalized: String = normalized
        .trim_matches('-')
        .chars()
        .take(MAX_NAME_LENGTH)
        .collect();
    let normalized = normalized.trim_end_matches('-');

    if normalized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        normalized.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identifier_parses_back() {
        let id = Identifier::new("My Training Run");
        assert_eq!(id.name(), "my-training-run");

        let parsed = Identifier::parse(&id.long()).unwrap();
        assert_eq!(parsed, id);
        assert!(id.long().starts_with("tpi-my-training-run-"));
    }

    #[test]
    fn test_deterministic_identifier_is_stable() {
        let a = Identifier::deterministic("nightly");
        let b = Identifier::deterministic("nightly");
        assert_eq!(a.long(), b.long());
        assert_ne!(a.long(), Identifier::deterministic("weekly").long());
    }

    #[test]
    fn test_short_identifier_shape() {
        let short = Identifier::new("x").short();
        assert_eq!(short.len(), 16);
        assert!(short.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_tampered_hash_is_rejected() {
        let id = Identifier::deterministic("nightly").long();
        let mut tampered = id[..id.len() - 1].to_string();
        tampered.push(if id.ends_with('0') { '1' } else { '0' });

        assert!(matches!(
            Identifier::parse(&tampered),
            Err(CloudError::InvalidIdentifier(_))
        ));
        assert!(Identifier::parse("not-an-identifier").is_err());
    }

    #[test]
    fn test_name_normalization() {
        assert_eq!(Identifier::new("--A__b--").name(), "a-b");
        assert_eq!(Identifier::new("!!!").name(), "task");
        assert!(Identifier::new(&"x".repeat(100)).name().len() <= MAX_NAME_LENGTH);
    }
}
