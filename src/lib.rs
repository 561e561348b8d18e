pub mod cli;
pub mod client;
pub mod config;
pub mod llm;
pub mod models;
pub mod server;
pub mod ui;

use cli::{ Args, ChatArgs, Command, ServeArgs };
use client::{ HttpRelayClient, RelayClient };
use config::persona::load_persona;
use llm::chat::OpenAIFactory;
use llm::LlmConfig;
use log::info;
use server::api::AppState;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Chat(chat_args) => chat(chat_args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Relay Configuration ---");
    info!("Bind Address: {}:{}", args.bind, args.http_port);
    info!("Chat Model: {}", args.chat_model);
    info!("Chat Endpoint: {}", args.chat_base_url);
    info!("API Key Variable: {}", args.api_key_env);
    info!("Persona Path: {}", args.persona_path.as_deref().unwrap_or("built-in"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("---------------------------");

    let persona = load_persona(args.persona_path.as_deref())?;
    let providers = OpenAIFactory::new(LlmConfig {
        api_key: None,
        completion_model: Some(args.chat_model.clone()),
        base_url: Some(args.chat_base_url.clone()),
    });
    let state = AppState::new(persona, Arc::new(providers), args.api_key_env.clone());

    let server = Server::new(args, state);
    server.run().await?;

    Ok(())
}

async fn chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("Chat client using relay at {}", args.relay_url);
    let persona = load_persona(args.persona_path.as_deref())?;
    let relay: Arc<dyn RelayClient> = Arc::new(HttpRelayClient::new(args.relay_url.clone()));

    if args.plain {
        ui::plain::run_plain(persona, relay).await
    } else {
        ui::run_tui(persona, relay).await
    }
}
