use super::Context;
use leo_cloud::{CloudError, Identifier, Observe, TaskStatus, aggregate, within};
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

/// Delay between two reads in follow mode
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub parallelism: usize,
    pub timestamps: bool,
    pub follow: bool,
}

/// Result of a read session; only `Failed` maps to a failing exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
    /// Single pass, or a status that was not terminal yet
    Pending,
}

pub async fn handle(
    context: &Context,
    identifier: &str,
    options: &ReadOptions,
    quiet: impl FnOnce(),
) -> anyhow::Result<Outcome> {
    let identifier = Identifier::parse(identifier)?;
    let client = context.client().await?;
    let mut task = leo_cloud_azure::Task::new(client, identifier, leo_cloud::Task::default());

    let read_timeout = context.config.timeouts.read_timeout();
    let outcome = watch(
        &mut task,
        options,
        read_timeout,
        &mut std::io::stdout(),
        quiet,
    )
    .await?;

    for address in task.addresses() {
        tracing::debug!("Address: {}", address);
    }

    Ok(outcome)
}

/// Read `task` once, or until it reaches a terminal status in follow mode,
/// writing each new log line to `out` exactly once.
///
/// Every iteration gets its own `read_timeout`; there is no deadline for the
/// session as a whole. In follow mode `after_first_pass` runs once the first
/// iteration is printed, so callers can lower verbosity for the polls that
/// follow.
pub async fn watch<T, W>(
    task: &mut T,
    options: &ReadOptions,
    read_timeout: Duration,
    out: &mut W,
    after_first_pass: impl FnOnce(),
) -> leo_cloud::Result<Outcome>
where
    T: Observe,
    W: Write,
{
    // Lines already printed, per log source
    let mut cursors: BTreeMap<String, usize> = BTreeMap::new();
    let mut after_first_pass = Some(after_first_pass);

    loop {
        let (blocks, status) = within(read_timeout, async {
            task.read().await?;
            let blocks = task.logs().await?;
            let status = task.status().await?;
            Ok::<_, CloudError>((blocks, status))
        })
        .await?;

        for block in &blocks {
            let lines = split_block(&block.text, options.timestamps);
            let cursor = cursors.entry(block.source.clone()).or_default();
            if let Some(delta) = lines.get(*cursor..) {
                for line in delta {
                    writeln!(out, "{}", line)?;
                }
                *cursor = lines.len();
            }
        }
        out.flush()?;

        let result = aggregate(&status, options.parallelism);

        // Diagnostics are only useful once; later passes would repeat them
        if after_first_pass.is_some() {
            for event in task.events() {
                tracing::debug!("{}", event.line(options.timestamps));
            }
            tracing::debug!("Status: {}", result);
        }

        if !options.follow {
            return Ok(Outcome::Pending);
        }
        if let Some(quiet) = after_first_pass.take() {
            quiet();
        }

        if result.is_terminal() {
            return Ok(match result {
                TaskStatus::Succeeded => Outcome::Succeeded,
                _ => Outcome::Failed,
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Split one log block into lines, dropping the leading timestamp token of
/// each line unless `timestamps` is set
fn split_block(text: &str, timestamps: bool) -> Vec<String> {
    let text = text.trim_matches('\n');
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .map(|line| {
            if timestamps {
                line.to_string()
            } else {
                match line.split_once(char::is_whitespace) {
                    Some((_, rest)) => rest.trim_start().to_string(),
                    None => String::new(),
                }
            }
        })
        .collect()
}
