use clap::{Parser, Subcommand};
use rst_common::with_tokio::tokio;

use prople_courierd::errors::CourierError;
use prople_courierd::svc::{self, Daemon};

#[derive(Parser)]
#[command(name = "courierd")]
#[command(version = "1.0")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "provision")]
    #[command(about = "Provision the configured agent to its agency")]
    Provision {
        #[arg(short, long, value_name = "FILE")]
        #[arg(required = true)]
        config: Option<String>,
    },

    #[command(name = "demo")]
    #[command(about = "Run the issuer and holder workflow against the loopback agency")]
    Demo {
        #[arg(short, long, value_name = "FILE")]
        #[arg(required = true)]
        config: Option<String>,

        #[arg(long, value_name = "NAME", default_value = "alice")]
        holder: String,
    },

    #[command(name = "inspect")]
    #[command(about = "Print the persisted protocol objects")]
    Inspect {
        #[arg(short, long, value_name = "FILE")]
        #[arg(required = true)]
        config: Option<String>,

        #[arg(short, long, value_name = "NAMESPACE")]
        namespace: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CourierError> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Provision { config } => {
            let daemon = Daemon::new(config.to_owned().unwrap_or_default())?;
            let _ = svc::provision::run(&daemon).await?;
        }
        Commands::Demo { config, holder } => {
            let daemon = Daemon::new(config.to_owned().unwrap_or_default())?;
            let _ = svc::demo::run(&daemon, holder.to_owned()).await?;
        }
        Commands::Inspect { config, namespace } => {
            let daemon = Daemon::new(config.to_owned().unwrap_or_default())?;
            let _ = svc::inspect::run(&daemon, namespace.to_owned()).await?;
        }
    }

    Ok(())
}
