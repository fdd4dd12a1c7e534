use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;

use s2h::{FilterSet, Server};

#[derive(Parser)]
#[command(
    name = "s2h",
    version,
    about = "A simple tool to convert socks5 proxy protocol to http proxy protocol"
)]
struct Args {
    /// HTTP listen address
    #[arg(short, long, value_name = "ADDR", default_value = "0.0.0.0:8081")]
    listen: String,

    /// Remote SOCKS5 server address
    #[arg(short, long, value_name = "ADDR", default_value = "127.0.0.1:1080")]
    socks5: String,

    /// File of hostname regex filters that go through the proxy
    #[arg(short, long, value_name = "FILE")]
    filename: Option<PathBuf>,

    /// Upstream connect and handshake timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    timeout: u64,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // A bad filter file is fatal before the listener binds.
    let filters = match &args.filename {
        Some(path) => match FilterSet::from_file(path) {
            Ok(filters) => {
                info!("Loaded {} host filter(s) from {}", filters.len(), path.display());
                filters
            }
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("No filters explicitly set, always using proxy.");
            FilterSet::empty()
        }
    };

    info!("Starting Socks5 Proxy Convert Server...");
    info!("HTTP Listen Address: {}", args.listen);
    info!("Socks5 Server Address: {}", args.socks5);

    let listener = match TcpListener::bind(&args.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    let server = Server::new(args.socks5, filters, Duration::from_secs(args.timeout));
    if let Err(e) = server.run(listener).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
