use anyhow::Result;
use clap::Parser;
use redfish_exporter::{config::Config, server};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, about, long_about = None, disable_version_flag = true)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Address to listen on for web interface and telemetry
    #[arg(long = "web.listen-address", env = "LISTEN_ADDRESS")]
    listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", env = "METRICS_PATH")]
    telemetry_path: Option<String>,

    /// Redfish username (overrides config)
    #[arg(long, env = "REDFISH_USERNAME")]
    username: Option<String>,

    /// Redfish password (overrides config)
    #[arg(long, env = "REDFISH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip TLS certificate verification (overrides config)
    #[arg(long, env = "REDFISH_INSECURE")]
    insecure: Option<bool>,

    /// Print version information and exit
    #[arg(long)]
    version: bool,
}

fn version() -> String {
    format!(
        "redfish-exporter {}-{}",
        env!("CARGO_PKG_VERSION"),
        option_env!("REDFISH_EXPORTER_COMMIT").unwrap_or("none")
    )
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("debug") => "debug".into(),
            _ => "info".into(),
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    if args.version {
        println!("{}", version());
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {}", version());

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(listen_address) = args.listen_address {
        config.server.listen_address = listen_address;
    }
    if let Some(path) = args.telemetry_path {
        config.server.metrics_path = path;
    }
    if let Some(username) = args.username {
        config.redfish.username = username;
    }
    if let Some(password) = args.password {
        config.redfish.password = secrecy::SecretString::new(password.into());
    }
    if let Some(insecure) = args.insecure {
        config.redfish.insecure = insecure;
    }

    config.validate()?;

    info!("Configuration loaded successfully");
    info!("Default Redfish host: {}", config.redfish.host);
    info!(
        "Scrape interval {}s, timeout {}s (informational)",
        config.metrics.scrape_interval_seconds, config.metrics.timeout_seconds
    );
    info!(
        "Metrics endpoint: http://{}{}?target=<bmc>",
        config.server.listen_address, config.server.metrics_path
    );

    // Start the metrics server
    if let Err(e) = server::start(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
