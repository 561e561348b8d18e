use futures::StreamExt;
use log::{ error, info };
use std::sync::Arc;

use super::relay::RelayClient;
use crate::config::persona::PersonaConfig;
use crate::models::chat::{ ChatMessage, Role, Turn };

pub const GREETING_ID: &str = "initial-message";

/// Where one submission cycle currently is. Errors return straight to
/// `Idle` with a notice set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    Streaming,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Started,
    Fragment(String),
    Finished,
    Failed(String),
}

/// In-memory conversation plus the input box and loading state.
pub struct ChatSession {
    persona: Arc<PersonaConfig>,
    turns: Vec<Turn>,
    input: String,
    phase: Phase,
    error_notice: Option<String>,
    streaming_turn: Option<usize>,
}

impl ChatSession {
    pub fn new(persona: Arc<PersonaConfig>) -> Self {
        let greeting = Turn::with_id(GREETING_ID, Role::Assistant, persona.greeting.clone());
        Self {
            persona,
            turns: vec![greeting],
            input: String::new(),
            phase: Phase::Idle,
            error_notice: None,
            streaming_turn: None,
        }
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn push_input(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_input(&mut self) {
        self.input.pop();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn error_notice(&self) -> Option<&str> {
        self.error_notice.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error_notice = None;
    }

    /// Appends the input as a user turn and returns the conversation to send.
    /// Blank input, or a cycle already in flight, makes this a no-op.
    pub fn submit(&mut self) -> Option<Vec<ChatMessage>> {
        if self.input.trim().is_empty() || self.is_loading() {
            return None;
        }

        let content = std::mem::take(&mut self.input);
        self.turns.push(Turn::new(Role::User, content));
        self.error_notice = None;
        self.phase = Phase::Submitting;

        Some(self.turns.iter().map(Turn::to_message).collect())
    }

    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Started => {
                self.open_reply();
            }
            StreamEvent::Fragment(text) => {
                let idx = self.open_reply();
                self.turns[idx].content.push_str(&text);
            }
            StreamEvent::Finished => {
                self.streaming_turn = None;
                self.phase = Phase::Idle;
            }
            StreamEvent::Failed(detail) => {
                error!("Chat error: {}", detail);
                if let Some(idx) = self.streaming_turn.take() {
                    if self.turns[idx].content.is_empty() {
                        self.turns.remove(idx);
                    }
                }
                self.phase = Phase::Idle;
                self.error_notice = Some(self.persona.error_notice.clone());
            }
        }
    }

    fn open_reply(&mut self) -> usize {
        if let Some(idx) = self.streaming_turn {
            return idx;
        }
        self.turns.push(Turn::new(Role::Assistant, String::new()));
        let idx = self.turns.len() - 1;
        self.streaming_turn = Some(idx);
        self.phase = Phase::Streaming;
        idx
    }
}

/// Runs one relay call and reports its progress through `emit`.
/// Nothing is retried; the first error ends the cycle.
pub async fn pump<F>(relay: &dyn RelayClient, messages: Vec<ChatMessage>, mut emit: F)
    where F: FnMut(StreamEvent)
{
    let mut fragments = match relay.send(messages).await {
        Ok(stream) => stream,
        Err(e) => {
            emit(StreamEvent::Failed(e.to_string()));
            return;
        }
    };
    emit(StreamEvent::Started);

    while let Some(item) = fragments.next().await {
        match item {
            Ok(text) => {
                if !text.is_empty() {
                    emit(StreamEvent::Fragment(text));
                }
            }
            Err(e) => {
                emit(StreamEvent::Failed(e.to_string()));
                return;
            }
        }
    }
    emit(StreamEvent::Finished);
}

/// Submits the current input and drives the reply to completion inline,
/// calling `on_render` after every state change. Returns false when the
/// submission was a no-op.
pub async fn converse<R>(session: &mut ChatSession, relay: &dyn RelayClient, mut on_render: R) -> bool
    where R: FnMut(&ChatSession)
{
    let Some(messages) = session.submit() else {
        return false;
    };
    info!("Submitting conversation of {} turns", messages.len());
    on_render(session);

    pump(relay, messages, |event| {
        session.apply(event);
        on_render(session);
    }).await;
    true
}
