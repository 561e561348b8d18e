pub mod openai;
pub mod sse;

use async_trait::async_trait;
use futures::{ Future, Stream };
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::LlmConfig;
use self::openai::OpenAIChatClient;
use crate::models::chat::ChatMessage;

/// Incremental text fragments produced by a provider, in arrival order.
pub type TokenStream = Pin<
    Box<dyn Stream<Item = Result<String, Box<dyn StdError + Send + Sync>>> + Send>
>;

pub type TokenSender = mpsc::Sender<Result<String, Box<dyn StdError + Send + Sync>>>;

const STREAM_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider returned HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("Provider stream error: {0}")]
    Api(String),
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opens a streaming completion. Resolves once the provider has accepted
    /// the request, so failures before the first byte surface here rather
    /// than inside the stream.
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>
    ) -> Result<TokenStream, Box<dyn StdError + Send + Sync>>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

/// Builds a provider client for one request from a freshly resolved credential.
pub trait ChatClientFactory: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>>;
}

/// Factory for OpenAI-compatible chat-completion endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIFactory {
    config: LlmConfig,
}

impl OpenAIFactory {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

impl ChatClientFactory for OpenAIFactory {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
        new_client(&self.config.with_api_key(api_key))
    }
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(client))
}

/// Runs `producer` on its own task and exposes what it sends as a stream.
/// The bounded channel gives backpressure; once the consumer is dropped,
/// sends fail and the producer is expected to return.
pub fn create_streaming_response<F, Fut>(producer: F) -> TokenStream
    where
        F: FnOnce(TokenSender) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static
{
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        producer(tx).await;
    });

    Box::pin(ReceiverStream::new(rx))
}
