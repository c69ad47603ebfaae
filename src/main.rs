use clap::Parser;
use msg_relay::{config::Config, server::RelayServer, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "msg-relay")]
#[command(about = "Transparent TCP relay counting REQ/ACK/NAK messages")]
struct Cli {
    /// Address to listen on for clients
    #[arg(short, long)]
    listen: Option<String>,

    /// Backend server address
    #[arg(short, long)]
    forward: Option<String>,

    /// Address of the metrics HTTP endpoint
    #[arg(short, long)]
    metrics: Option<String>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose when set
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = if let Some(config_path) = cli.config {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };

    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    if let Some(forward) = cli.forward {
        config.forward_addr = forward;
    }
    if let Some(metrics) = cli.metrics {
        config.metrics_addr = metrics;
    }

    info!(
        listen = %config.listen_addr,
        forward = %config.forward_addr,
        metrics = %config.metrics_addr,
        "Configuration loaded"
    );

    RelayServer::new(config).run().await
}
