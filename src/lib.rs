pub mod relay;
pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod client;

use cli::Args;
use log::info;
use relay::Relay;
use server::Server;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("(default)"));
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("(default)"));
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("(built-in)"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let relay = Arc::new(Mutex::new(Relay::new(&args)?));
    let server = Server::new(relay, args);
    server.run().await?;

    Ok(())
}
