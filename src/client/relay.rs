use async_trait::async_trait;
use futures::{ Stream, StreamExt };
use log::{ debug, info };
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::models::chat::ChatMessage;
use crate::models::relay::RelayRequest;

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Relay returned HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("Could not decode reply: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Sends the conversation and yields the reply text as it arrives.
    async fn send(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream, ClientError>;
}

/// Turns raw body chunks into text, holding back a trailing partial
/// multi-byte sequence until the next chunk completes it.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn push(&mut self, chunk: &[u8]) -> Result<String, ClientError> {
        self.pending.extend_from_slice(chunk);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                return Err(ClientError::Decode(e.to_string()));
            }
        };
        let ready: Vec<u8> = self.pending.drain(..valid).collect();
        String::from_utf8(ready).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub fn finish(self) -> Result<(), ClientError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Decode(format!("{} dangling bytes at end of stream", self.pending.len())))
        }
    }
}

pub struct HttpRelayClient {
    http: reqwest::Client,
    url: String,
}

impl HttpRelayClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn send(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream, ClientError> {
        info!("Sending {} turns to {}", messages.len(), self.url);
        let resp = self.http.post(&self.url).json(&RelayRequest { messages }).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status { status: status.as_u16(), body });
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut bytes = resp.bytes_stream();
            let mut decoder = Utf8Decoder::default();

            while let Some(chunk) = bytes.next().await {
                let item = match chunk {
                    Ok(buf) => decoder.push(&buf),
                    Err(e) => Err(ClientError::from(e)),
                };
                let failed = item.is_err();
                if let Ok(text) = &item {
                    if text.is_empty() {
                        continue;
                    }
                }
                if tx.send(item).await.is_err() || failed {
                    return;
                }
            }

            if let Err(e) = decoder.finish() {
                let _ = tx.send(Err(e)).await;
            }
            debug!("Relay stream finished");
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
