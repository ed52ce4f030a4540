mod cli;
mod client;
mod config;
mod dto;
mod server;
mod transcript;
mod youtube;

use clap::Parser;
use log::info;

use crate::cli::{Cli, Commands};
use crate::config::{ClientConfig, ServerConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // `.env` has to be loaded before clap reads its env fallbacks.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            let config = ServerConfig::from_env(host, port)?;
            server::run_server(config).await?;
        }
        Commands::Fetch {
            video,
            server_url,
            json,
        } => {
            info!("Fetching transcript for {video} via {server_url}");
            client::run_client(ClientConfig::new(server_url, video, json)).await?;
        }
    }

    Ok(())
}
