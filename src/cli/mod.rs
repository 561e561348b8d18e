use clap::{ Parser, Subcommand };

use crate::llm::{ DEFAULT_CHAT_MODEL, DEFAULT_CHAT_URL };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the streaming chat relay
    Serve(ServeArgs),
    /// Open the chat client against a running relay
    Chat(ChatArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    // --- Server Args ---
    /// Address the relay binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the HTTP relay
    #[arg(long, env = "HTTP_PORT", default_value = "3000")]
    pub http_port: u16,

    // --- Chat LLM Provider Args ---
    /// Model name for chat completion (e.g., gpt-3.5-turbo, gpt-4o)
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// Full URL of the OpenAI-compatible chat completions endpoint
    #[arg(long, env = "CHAT_BASE_URL", default_value = DEFAULT_CHAT_URL)]
    pub chat_base_url: String,

    /// Environment variable holding the provider API key. Read on every request.
    #[arg(long, env = "API_KEY_ENV", default_value = "OPENAI_API_KEY")]
    pub api_key_env: String,

    // --- Persona Args ---
    /// JSON file overriding the built-in persona
    #[arg(long, env = "PERSONA_PATH")]
    pub persona_path: Option<String>,

    // --- TLS Args ---
    /// Serve the relay over HTTPS
    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Path to the TLS certificate file (PEM format)
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Path to the TLS private key file (PEM format)
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChatArgs {
    /// Relay chat endpoint
    #[arg(long, env = "RELAY_URL", default_value = "http://127.0.0.1:3000/api/chat")]
    pub relay_url: String,

    /// JSON file overriding the built-in persona (greeting, tip address, ...)
    #[arg(long, env = "PERSONA_PATH")]
    pub persona_path: Option<String>,

    /// Line-oriented mode instead of the full-screen UI
    #[arg(long, default_value = "false")]
    pub plain: bool,

    /// Write logs to this file. The full-screen UI logs nothing otherwise.
    #[arg(long, env = "CHAT_LOG_FILE")]
    pub log_file: Option<String>,
}
