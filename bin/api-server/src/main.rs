//! API server binary

use std::net::SocketAddr;

use api::ApiState;
use clap::Parser;
use config::Opts;
use dotenvy::dotenv;
use feed::FeedClient;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;
use warehouse::{ConnectionProvider, EnvSecretStore};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();
    let opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let reader = ConnectionProvider::new(EnvSecretStore).open(opts.warehouse.url)?;
    let feed = FeedClient::with_base_url(opts.feed.api_key, opts.feed.base_url);
    info!(feed = %feed.base_url(), "Hosted query API configured");

    let addr: SocketAddr = format!("{}:{}", opts.api.host, opts.api.port).parse()?;
    server::run(addr, ApiState::new(reader, feed), opts.api.allowed_origins).await
}
