//! Ephemeral, non-blocking notifications with a fixed fire-once auto-hide.

use std::time::Duration;

pub const TOAST_LIFETIME: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
    remaining: Duration,
}

#[derive(Debug, Default)]
pub struct Toasts {
    items: Vec<Toast>,
}

impl Toasts {
    pub fn info(&mut self, text: impl Into<String>) {
        self.push(ToastKind::Info, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(ToastKind::Error, text);
    }

    pub fn push(&mut self, kind: ToastKind, text: impl Into<String>) {
        self.items.push(Toast {
            kind,
            text: text.into(),
            remaining: TOAST_LIFETIME,
        });
    }

    /// Ages all toasts and drops the expired ones. The timer is not
    /// cancellable or refreshable.
    pub fn tick(&mut self, dt: Duration) {
        for toast in &mut self.items {
            toast.remaining = toast.remaining.saturating_sub(dt);
        }
        self.items.retain(|t| !t.remaining.is_zero());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
