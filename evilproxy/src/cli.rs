//! Parses the command line arguments.

use crate::proxy::ProxySettings;
use clap::Parser;
use tracing_subscriber::FmtSubscriber;

/// Stores the different command line arguments.
#[derive(Parser)]
#[command(
    version,
    about = "An intercepting TCP proxy that routes traffic through a simulated, adverse network"
)]
pub struct Args {
    /// Address of the upstream endpoint that proxied traffic is forwarded to
    #[arg(short, long, default_value = "127.0.0.1:80")]
    pub client: String,
    /// Address the proxy listens on for inbound connections
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub server: String,
    /// Number of sessions to serve before exiting. Unlimited when omitted
    #[arg(long)]
    pub connections: Option<usize>,
    /// Simulation rule used to build each session's transport,
    /// e.g. "latency:250"
    #[arg(short, long, default_value = "")]
    pub rule: String,
    /// Log per-session task accounting for leak diagnosis
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    pub fn settings(&self) -> ProxySettings {
        ProxySettings {
            client: self.client.clone(),
            server: self.server.clone(),
            connections: self.connections,
            rule: self.rule.clone(),
            debug: self.debug,
        }
    }
}

/// Initializes logging. Should only be called once when the proxy starts.
pub fn initialize_logging(debug: bool) {
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_max_level(if debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}
