//! Machine startup script rendering

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tera::{Context, Tera};

const MACHINE_SCRIPT_TEMPLATE: &str = include_str!("../templates/machine-script.sh.tera");

/// Turns a user script into the startup script each machine runs
pub trait ScriptRenderer: Send + Sync {
    fn render(
        &self,
        script: &str,
        credentials: &BTreeMap<String, String>,
        variables: &BTreeMap<String, String>,
        deadline: DateTime<Utc>,
    ) -> Result<String>;
}

/// Default renderer: exports credentials and variables, runs the script with
/// timestamped output, publishes logs and the exit status as reports, and
/// powers the machine off at the deadline
#[derive(Debug, Clone, Default)]
pub struct MachineScript;

impl ScriptRenderer for MachineScript {
    fn render(
        &self,
        script: &str,
        credentials: &BTreeMap<String, String>,
        variables: &BTreeMap<String, String>,
        deadline: DateTime<Utc>,
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert("script", &STANDARD.encode(script));
        context.insert("credentials", &quote_values(credentials));
        context.insert("variables", &quote_values(variables));
        context.insert("deadline", &deadline.timestamp());
        context.insert("deadline_text", &deadline.to_rfc3339());

        tracing::debug!(
            credentials = credentials.len(),
            variables = variables.len(),
            "Rendering machine script"
        );

        Ok(Tera::one_off(MACHINE_SCRIPT_TEMPLATE, &context, false)?)
    }
}

fn quote_values(values: &BTreeMap<String, String>) -> BTreeMap<&str, String> {
    values
        .iter()
        .map(|(name, value)| (name.as_str(), shell_quote(value)))
        .collect()
}

/// Single-quote `value` for POSIX shells
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
