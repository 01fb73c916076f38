use super::Context;
use colored::Colorize;
use leo_cloud::{
    Environment, Firewall, FirewallRule, Identifier, Lifecycle, Size, Spot, Variables, within,
};
use std::io::Read;
use std::path::Path;
use std::time::Duration;

pub struct CreateOptions {
    pub name: String,
    pub image: String,
    pub machine: String,
    pub disk_size: i32,
    pub spot: Option<f64>,
    pub parallelism: u16,
    pub timeout: u64,
    pub script: Option<String>,
    pub env: Vec<String>,
    pub permission_set: String,
    pub ports: Vec<u16>,
}

impl CreateOptions {
    fn task(&self) -> anyhow::Result<leo_cloud::Task> {
        if self.parallelism == 0 {
            anyhow::bail!("--parallelism must be at least 1");
        }

        let script = match &self.script {
            Some(script) => load_script(script)?,
            None => String::new(),
        };
        let ingress = FirewallRule {
            nets: None,
            ports: (!self.ports.is_empty()).then(|| self.ports.clone()),
        };

        Ok(leo_cloud::Task {
            size: Size {
                machine: self.machine.clone(),
                storage: self.disk_size,
            },
            environment: Environment {
                image: self.image.clone(),
                script,
                variables: Variables::parse(&self.env)?,
                timeout: Duration::from_secs(self.timeout),
            },
            firewall: Firewall {
                ingress,
                egress: FirewallRule::default(),
            },
            permission_set: self.permission_set.clone(),
            spot: self.spot.map(Spot).unwrap_or(Spot::DISABLED),
            parallelism: self.parallelism,
            ..Default::default()
        })
    }
}

/// `-` reads stdin, an existing path reads the file, anything else is the
/// script itself
fn load_script(script: &str) -> anyhow::Result<String> {
    if script == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }

    let path = Path::new(script);
    if path.is_file() {
        return Ok(std::fs::read_to_string(path)?);
    }

    Ok(script.to_string())
}

pub async fn handle(context: &Context, options: CreateOptions) -> anyhow::Result<()> {
    let definition = options.task()?;
    let identifier = Identifier::new(&options.name);
    let client = context.client().await?;

    println!("{}", format!("Creating task {}...", identifier).yellow());
    let mut task = leo_cloud_azure::Task::new(client, identifier.clone(), definition);

    let timeouts = context.config.timeouts;
    if let Err(e) = within(timeouts.create_timeout(), task.create()).await {
        tracing::warn!("Create failed, removing partial resources: {}", e);
        if let Err(cleanup) = within(timeouts.delete_timeout(), task.delete()).await {
            tracing::warn!("Cleanup of {} failed: {}", identifier, cleanup);
        }
        return Err(e.into());
    }

    println!("{}", "✓ Task created".green());
    println!("{}", identifier);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CreateOptions {
        CreateOptions {
            name: "train".to_string(),
            image: "ubuntu".to_string(),
            machine: "m".to_string(),
            disk_size: 0,
            spot: None,
            parallelism: 1,
            timeout: 3600,
            script: None,
            env: Vec::new(),
            permission_set: String::new(),
            ports: Vec::new(),
        }
    }

    #[test]
    fn test_task_defaults() {
        let task = options().task().unwrap();
        assert_eq!(task.spot, Spot::DISABLED);
        assert!(task.firewall.ingress.ports.is_none());
        assert_eq!(task.environment.timeout, Duration::from_secs(3600));
        assert!(task.environment.script.is_empty());
    }

    #[test]
    fn test_task_from_flags() {
        let task = CreateOptions {
            spot: Some(0.0),
            ports: vec![22, 8080],
            env: vec!["EPOCHS=10".to_string(), "AWS_*".to_string()],
            script: Some("echo hello".to_string()),
            ..options()
        }
        .task()
        .unwrap();

        assert_eq!(task.spot, Spot::ENABLED);
        assert_eq!(task.firewall.ingress.ports, Some(vec![22, 8080]));
        assert_eq!(task.environment.script, "echo hello");
        assert!(!task.environment.variables.is_empty());
    }

    #[test]
    fn test_script_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("train.sh");
        std::fs::write(&path, "#!/bin/sh\npython train.py\n").unwrap();

        let script = load_script(path.to_str().unwrap()).unwrap();
        assert_eq!(script, "#!/bin/sh\npython train.py\n");
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let result = CreateOptions {
            parallelism: 0,
            ..options()
        }
        .task();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_variable_rejected() {
        let result = CreateOptions {
            env: vec!["=value".to_string()],
            ..options()
        }
        .task();
        assert!(result.is_err());
    }
}
