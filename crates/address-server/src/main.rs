use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "ADDRESS_SERVER_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tracing::info!(
        addr = %cli.addr,
        name = address_server::SERVER_NAME,
        version = address_server::SERVER_VERSION,
        "Address lookup server running at http://{}/mcp",
        cli.addr
    );
    warp::serve(address_server::routes()).run(cli.addr).await;
}
