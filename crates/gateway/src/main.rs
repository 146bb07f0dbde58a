//! RepairHub gateway - HTTP API for the maintenance marketplace.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway_lib::config::GatewayConfig;
use marketplace_lib::MigrateAction;

#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "RepairHub marketplace API", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long, env = "GATEWAY_HOST")]
        host: Option<String>,
        #[arg(long, env = "GATEWAY_PORT")]
        port: Option<u16>,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateCommand,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum MigrateCommand {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

impl From<MigrateCommand> for MigrateAction {
    fn from(command: MigrateCommand) -> Self {
        match command {
            MigrateCommand::Up => MigrateAction::Up,
            MigrateCommand::Down => MigrateAction::Down,
            MigrateCommand::Status => MigrateAction::Status,
            MigrateCommand::Fresh => MigrateAction::Fresh,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = GatewayConfig::from_env()?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            gateway_lib::run_server(config).await?;
        }
        Commands::Migrate { action } => {
            let database = common::DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| common::DatabaseConfig::default().url),
                ..Default::default()
            };
            let states = marketplace_lib::run_migrations(action.into(), &database).await?;
            if matches!(action, MigrateCommand::Status) {
                for state in states {
                    let marker = if state.applied { "[x]" } else { "[ ]" };
                    println!("{} {}", marker, state.name);
                }
            }
        }
    }

    Ok(())
}
