use clap::Parser;
use evilproxy::cli::{initialize_logging, Args};
use evilproxy::proxy;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    initialize_logging(args.debug);
    if let Err(error) = proxy::run(args.settings()).await {
        tracing::error!(%error, "proxy exited");
        std::process::exit(1);
    }
}
