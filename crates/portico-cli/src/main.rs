//! Portico - directory gateway
//!
//! Authenticates users and looks up their records against a fixed pool of
//! LDAP/Active Directory servers, with health-aware failover.

use clap::{Parser, Subcommand, ValueEnum};
use portico_api::GatewayServer;
use portico_auth::LdapConnector;
use portico_core::config::PorticoConfig;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "portico")]
#[command(author = "Portico Team")]
#[command(version = portico_core::VERSION)]
#[command(about = "Health-aware gateway in front of a directory server pool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PORTICO_CONFIG")]
    config: Option<String>,

    /// Bind address
    #[arg(long, env = "PORTICO_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port number
    #[arg(short, long, env = "PORTICO_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PORTICO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, env = "PORTICO_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway (default)
    Server,

    /// Validate the configuration and exit
    CheckConfig,

    /// Show version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("portico {}", portico_core::VERSION);
        return Ok(());
    }

    let mut config = PorticoConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = match format {
            LogFormat::Pretty => "pretty".to_string(),
            LogFormat::Json => "json".to_string(),
        };
    }

    init_logging(&config);
    config.validate()?;

    match cli.command {
        Some(Commands::CheckConfig) => {
            info!(
                endpoints = config.directory.endpoints.len(),
                "Configuration is valid"
            );
            Ok(())
        }
        _ => run_server(config).await,
    }
}

fn init_logging(config: &PorticoConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

async fn run_server(config: PorticoConfig) -> anyhow::Result<()> {
    info!("Starting Portico {}", portico_core::VERSION);
    for endpoint in &config.directory.endpoints {
        info!(endpoint = %endpoint, "Directory endpoint");
    }
    info!(
        search_base = %config.directory.search_base,
        timeout_secs = config.directory.timeout_seconds,
        "Directory settings"
    );

    let connector = Arc::new(LdapConnector::new(&config.directory));
    GatewayServer::new(config, connector).run().await?;

    Ok(())
}
