use super::Context;
use colored::Colorize;
use leo_cloud::{Identifier, Lifecycle, within};

pub async fn handle(context: &Context, identifier: &str) -> anyhow::Result<()> {
    let identifier = Identifier::parse(identifier)?;
    let client = context.client().await?;

    println!("{}", format!("Deleting task {}...", identifier).yellow());
    let mut task = leo_cloud_azure::Task::new(client, identifier, leo_cloud::Task::default());
    within(context.config.timeouts.delete_timeout(), task.delete()).await?;

    println!("{}", "✓ Task deleted".green());
    Ok(())
}
