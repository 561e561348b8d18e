pub mod plain;
mod view;

use log::{ error, info };
use ratatui::crossterm::event::{ self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers };
use ratatui::DefaultTerminal;
use std::error::Error;
use std::sync::Arc;
use std::time::{ Duration, Instant };
use tokio::sync::mpsc;

use crate::client::clipboard::copy_to_clipboard;
use crate::client::notice::{ ToastLevel, Toasts };
use crate::client::scroll::ScrollTracker;
use crate::client::{ pump, ChatSession, RelayClient, StreamEvent };
use crate::config::persona::PersonaConfig;
use crate::models::chat::ChatMessage;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const PAGE_ROWS: u16 = 10;

/// Everything the full-screen client shows, minus the terminal itself.
pub struct ChatScreen {
    pub session: ChatSession,
    pub scroll: ScrollTracker,
    pub toasts: Toasts,
    pub tip_open: bool,
    pub should_quit: bool,
}

impl ChatScreen {
    pub fn new(persona: Arc<PersonaConfig>) -> Self {
        Self {
            session: ChatSession::new(persona),
            scroll: ScrollTracker::default(),
            toasts: Toasts::default(),
            tip_open: false,
            should_quit: false,
        }
    }

    /// Applies one key press. Returns the conversation to send when the
    /// press submitted a message.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Vec<ChatMessage>> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            self.should_quit = true;
            return None;
        }

        if self.tip_open {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => {
                    self.tip_open = false;
                }
                KeyCode::Char('c') | KeyCode::Char('y') => self.copy_tip_address(),
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Char('t') if ctrl => {
                self.tip_open = true;
            }
            KeyCode::F(2) => {
                self.tip_open = true;
            }
            KeyCode::Esc => {
                self.session.dismiss_error();
                self.toasts.dismiss_all();
            }
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.session.push_input('\n');
            }
            KeyCode::Enter => {
                let submitted = self.session.submit();
                if submitted.is_some() {
                    self.scroll.scroll_to_bottom();
                }
                return submitted;
            }
            KeyCode::Backspace => self.session.pop_input(),
            KeyCode::Up => self.scroll.scroll_up(1),
            KeyCode::Down => self.scroll.scroll_down(1),
            KeyCode::PageUp => self.scroll.scroll_up(PAGE_ROWS),
            KeyCode::PageDown => self.scroll.scroll_down(PAGE_ROWS),
            KeyCode::End => self.scroll.scroll_to_bottom(),
            KeyCode::Char(c) if !ctrl => self.session.push_input(c),
            _ => {}
        }
        None
    }

    fn copy_tip_address(&mut self) {
        let address = self.session.persona().tip_address.clone();
        match copy_to_clipboard(&address) {
            Ok(()) => {
                info!("Tip address copied");
                self.toasts.push(ToastLevel::Success, "Address copied to clipboard!");
            }
            Err(e) => {
                error!("Could not copy text: {}", e);
                self.toasts.push(ToastLevel::Error, "Failed to copy address. Please try again.");
            }
        }
    }
}

pub async fn run_tui(
    persona: Arc<PersonaConfig>,
    relay: Arc<dyn RelayClient>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, persona, relay).await;
    ratatui::restore();
    result
}

async fn event_loop(
    terminal: &mut DefaultTerminal,
    persona: Arc<PersonaConfig>,
    relay: Arc<dyn RelayClient>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<StreamEvent>();
    let mut screen = ChatScreen::new(persona);

    while !screen.should_quit {
        while let Ok(stream_event) = rx.try_recv() {
            screen.session.apply(stream_event);
        }
        screen.toasts.expire(Instant::now());

        terminal.draw(|frame| view::draw(frame, &mut screen))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(messages) = screen.handle_key(key) {
            let relay = relay.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                pump(relay.as_ref(), messages, |stream_event| {
                    let _ = tx.send(stream_event);
                }).await;
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Phase;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn screen() -> ChatScreen {
        ChatScreen::new(Arc::new(PersonaConfig::default()))
    }

    fn type_text(screen: &mut ChatScreen, text: &str) {
        for c in text.chars() {
            screen.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_submits_typed_text() {
        let mut screen = screen();
        type_text(&mut screen, "hi");

        let sent = screen.handle_key(press(KeyCode::Enter)).unwrap();
        assert_eq!(sent.last().unwrap().content, "hi");
        assert_eq!(screen.session.phase(), Phase::Submitting);
        assert!(screen.session.input().is_empty());
    }

    #[test]
    fn enter_on_empty_input_does_nothing() {
        let mut screen = screen();
        assert!(screen.handle_key(press(KeyCode::Enter)).is_none());
        assert_eq!(screen.session.turns().len(), 1);
    }

    #[test]
    fn shift_enter_adds_newline() {
        let mut screen = screen();
        type_text(&mut screen, "a");
        screen.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut screen, "b");
        assert_eq!(screen.session.input(), "a\nb");
        assert_eq!(screen.session.turns().len(), 1);
    }

    #[test]
    fn tip_dialog_captures_keys_until_closed() {
        let mut screen = screen();
        screen.handle_key(KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL));
        assert!(screen.tip_open);

        type_text(&mut screen, "x");
        assert!(screen.session.input().is_empty());

        screen.handle_key(press(KeyCode::Esc));
        assert!(!screen.tip_open);
    }

    #[test]
    fn escape_dismisses_error_notice() {
        let mut screen = screen();
        type_text(&mut screen, "hi");
        screen.handle_key(press(KeyCode::Enter));
        screen.session.apply(StreamEvent::Failed("offline".to_string()));
        assert!(screen.session.error_notice().is_some());

        screen.handle_key(press(KeyCode::Esc));
        assert!(screen.session.error_notice().is_none());
    }

    #[test]
    fn ctrl_c_quits() {
        let mut screen = screen();
        screen.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(screen.should_quit);
    }
}
