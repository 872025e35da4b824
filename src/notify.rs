//! User-visible toast notifications.
//!
//! DESIGN
//! ======
//! Purely cosmetic feedback for the UI. `ToastChannel` broadcasts toasts to
//! whatever view layer subscribes; `LogNotifier` writes them to the log for
//! headless use. Neither can fail or block the caller.

use serde::Serialize;
use tokio::sync::broadcast;

const TOAST_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

/// Transient, non-blocking message surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);

    fn success(&self, message: &str) {
        self.notify(Toast { level: ToastLevel::Success, message: message.to_owned() });
    }

    fn error(&self, message: &str) {
        self.notify(Toast { level: ToastLevel::Error, message: message.to_owned() });
    }
}

// =============================================================================
// CHANNEL
// =============================================================================

/// Broadcasts toasts to any number of listeners. Toasts sent with no
/// listener attached are dropped.
#[derive(Clone)]
pub struct ToastChannel {
    tx: broadcast::Sender<Toast>,
}

impl ToastChannel {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(TOAST_BUFFER);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }
}

impl Default for ToastChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ToastChannel {
    fn notify(&self, toast: Toast) {
        let _ = self.tx.send(toast);
    }
}

// =============================================================================
// LOG
// =============================================================================

/// Writes toasts to the log; used by the CLI, which has no toast surface.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Success => tracing::info!(text = %toast.message, "toast"),
            ToastLevel::Error => tracing::warn!(text = %toast.message, "toast"),
        }
    }
}
