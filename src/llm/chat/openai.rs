use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, info, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;

use super::sse::{ extract_data_payload, SseLineBuffer };
use super::{ create_streaming_response, ChatClient, ProviderError, TokenSender, TokenStream };
use crate::llm::{ LlmConfig, DEFAULT_CHAT_MODEL, DEFAULT_CHAT_URL };
use crate::models::chat::ChatMessage;

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIStreamResponse {
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    delta: OpenAIDelta,
}

#[derive(Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StreamEvent {
    Token(String),
    Done,
    Error(String),
    Skip,
}

pub(crate) fn parse_data_payload(payload: &str) -> StreamEvent {
    if payload == "[DONE]" {
        return StreamEvent::Done;
    }

    match serde_json::from_str::<OpenAIStreamResponse>(payload) {
        Ok(stream_resp) => {
            let content: String = stream_resp.choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect();
            if content.is_empty() {
                StreamEvent::Skip
            } else {
                StreamEvent::Token(content)
            }
        }
        Err(e) => {
            match serde_json::from_str::<serde_json::Value>(payload) {
                Ok(value) if value.get("error").is_some() => {
                    StreamEvent::Error(error_summary(&value))
                }
                _ => {
                    debug!("Ignoring unparseable stream payload ({}): {}", e, payload);
                    StreamEvent::Skip
                }
            }
        }
    }
}

fn error_summary(value: &serde_json::Value) -> String {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .map(str::to_owned)
        .unwrap_or_else(|| value.to_string())
}

/// Forwards one SSE line. Returns false once the stream should stop.
async fn forward_line(line: &str, tx: &TokenSender) -> bool {
    let Some(payload) = extract_data_payload(line) else {
        return true;
    };

    match parse_data_payload(payload) {
        StreamEvent::Token(content) => tx.send(Ok(content)).await.is_ok(),
        StreamEvent::Done => false,
        StreamEvent::Error(message) => {
            warn!("Provider reported an error mid-stream: {}", message);
            let _ = tx.send(Err(Box::new(ProviderError::Api(message)) as _)).await;
            false
        }
        StreamEvent::Skip => true,
    }
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_CHAT_URL.to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
            format!("Invalid API key format: {}", e)
        )?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| "OpenAI API key is required".to_string())?;

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>
    ) -> Result<TokenStream, Box<dyn StdError + Send + Sync>> {
        let req = OpenAIChatRequest {
            model: self.model.clone(),
            messages,
            stream: true,
        };

        let resp = self.http.post(&self.base_url).json(&req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(
                Box::new(ProviderError::Status {
                    status: status.as_u16(),
                    body,
                })
            );
        }
        info!("OpenAI stream opened (model {}, status {})", self.model, status);

        Ok(
            create_streaming_response(move |tx| async move {
                let mut bytes = resp.bytes_stream();
                let mut lines = SseLineBuffer::default();

                while let Some(chunk_result) = bytes.next().await {
                    let chunk = match chunk_result {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            let _ = tx.send(Err(Box::new(e) as _)).await;
                            return;
                        }
                    };

                    for line in lines.push(&chunk) {
                        if !forward_line(&line, &tx).await {
                            return;
                        }
                    }
                }

                if let Some(line) = lines.finish() {
                    forward_line(&line, &tx).await;
                }
            })
        )
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
