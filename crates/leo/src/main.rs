mod commands;

use clap::{Parser, Subcommand};
use commands::Context;
use commands::read::Outcome;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, reload};

#[derive(Parser)]
#[command(name = "leo")]
#[command(about = "Provision, observe and tear down ephemeral cloud tasks", long_about = None)]
struct Cli {
    /// Cloud region (us-east, us-west, eu-north, eu-west or a native location)
    #[arg(long, global = true, env = "LEO_REGION")]
    region: Option<String>,

    /// Configuration file
    #[arg(long, global = true, env = "LEO_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task and start its machines
    Create {
        /// Task name, used as part of the generated identifier
        name: String,
        /// Machine image alias or user@publisher:offer:sku:version[:#plan]
        #[arg(long, default_value = "ubuntu")]
        image: String,
        /// Machine class alias (s, m, l, xl, m+t4, ...) or provider machine type
        #[arg(long, default_value = "m")]
        machine: String,
        /// OS disk size in GB; 0 keeps the image default
        #[arg(long, default_value_t = 0)]
        disk_size: i32,
        /// Use spot instances, optionally with a maximum hourly price
        #[arg(long, num_args = 0..=1, default_missing_value = "0")]
        spot: Option<f64>,
        /// Number of machines
        #[arg(long, default_value_t = 1)]
        parallelism: u16,
        /// Machine lifetime in seconds
        #[arg(long, default_value_t = 24 * 60 * 60)]
        timeout: u64,
        /// Script file to run, `-` for stdin, or the script text itself
        #[arg(long)]
        script: Option<String>,
        /// Environment variable: NAME=VALUE, or NAME (or a NAME* glob) to copy
        /// from the local environment
        #[arg(short, long = "env")]
        env: Vec<String>,
        /// Comma-separated user-assigned identity ids
        #[arg(long, default_value = "")]
        permission_set: String,
        /// Inbound port to open (default: 22)
        #[arg(long = "port")]
        ports: Vec<u16>,
    },
    /// Read logs and status of an existing task
    Read {
        /// Task identifier
        identifier: String,
        /// Number of machines the task was created with
        #[arg(long, default_value_t = 1)]
        parallelism: u16,
        /// Show timestamps
        #[arg(long)]
        timestamps: bool,
        /// Poll until the task succeeds or fails
        #[arg(long)]
        follow: bool,
    },
    /// Delete a task and every resource it owns
    Delete {
        /// Task identifier
        identifier: String,
    },
    /// Show version information
    Version,
}

/// Exit code of a task that ran and failed
const TASK_FAILED: u8 = 1;
/// Exit code of anything that kept the tool itself from doing its job
const TOOL_ERROR: u8 = 2;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn init_tracing(verbose: bool) -> FilterHandle {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    handle
}

/// Keep warnings and errors only
fn quiet(handle: &FilterHandle) {
    if let Err(e) = handle.modify(|filter| *filter = EnvFilter::new("warn")) {
        tracing::warn!("Could not lower log level: {}", e);
    }
}

fn load_context(region: Option<String>, config: Option<&Path>) -> anyhow::Result<Context> {
    let config = leo_config::Config::load(config)?;
    let region = region.unwrap_or_else(|| config.region.clone());
    Ok(Context::new(config, region))
}

async fn run(cli: Cli, filter: &FilterHandle) -> anyhow::Result<Outcome> {
    let region = cli.region;
    let config = cli.config;

    match cli.command {
        Commands::Create {
            name,
            image,
            machine,
            disk_size,
            spot,
            parallelism,
            timeout,
            script,
            env,
            permission_set,
            ports,
        } => {
            let context = load_context(region, config.as_deref())?;
            let options = commands::create::CreateOptions {
                name,
                image,
                machine,
                disk_size,
                spot,
                parallelism,
                timeout,
                script,
                env,
                permission_set,
                ports,
            };
            commands::create::handle(&context, options).await?;
        }
        Commands::Read {
            identifier,
            parallelism,
            timestamps,
            follow,
        } => {
            let context = load_context(region, config.as_deref())?;
            let options = commands::read::ReadOptions {
                parallelism: usize::from(parallelism),
                timestamps,
                follow,
            };
            return commands::read::handle(&context, &identifier, &options, || quiet(filter))
                .await;
        }
        Commands::Delete { identifier } => {
            let context = load_context(region, config.as_deref())?;
            commands::delete::handle(&context, &identifier).await?;
        }
        Commands::Version => {
            println!("leo {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(Outcome::Succeeded)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = init_tracing(cli.verbose);

    match run(cli, &filter).await {
        Ok(Outcome::Failed) => ExitCode::from(TASK_FAILED),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(TOOL_ERROR)
        }
    }
}
