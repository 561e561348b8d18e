use std::collections::VecDeque;
use std::time::{ Duration, Instant };

pub const TOAST_TTL: Duration = Duration::from_millis(2000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    shown_at: Instant,
}

/// Short-lived notifications that disappear on their own.
#[derive(Debug)]
pub struct Toasts {
    items: VecDeque<Toast>,
    ttl: Duration,
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new(TOAST_TTL)
    }
}

impl Toasts {
    pub fn new(ttl: Duration) -> Self {
        Self { items: VecDeque::new(), ttl }
    }

    pub fn push(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.push_at(level, message, Instant::now());
    }

    pub fn push_at(&mut self, level: ToastLevel, message: impl Into<String>, now: Instant) {
        self.items.push_back(Toast { level, message: message.into(), shown_at: now });
    }

    pub fn expire(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.items.retain(|toast| now.duration_since(toast.shown_at) < ttl);
    }

    pub fn dismiss_all(&mut self) {
        self.items.clear();
    }

    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
