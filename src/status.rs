//! User-facing status updates
//!
//! The UI shell renders these verbatim. Every event is also written to the
//! log so operators see what the user saw.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Failure,
}

/// One single-line status update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub kind: StatusKind,
    pub message: String,
}

impl StatusEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, StatusKind::Success | StatusKind::Failure)
    }
}

/// Sending half handed to the connection manager and pipeline.
/// A sink with no receiver only logs.
#[derive(Debug, Clone, Default)]
pub struct StatusSink {
    tx: Option<mpsc::UnboundedSender<StatusEvent>>,
}

impl StatusSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(StatusKind::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(StatusKind::Success, message.into());
    }

    pub fn failure(&self, message: impl Into<String>) {
        self.emit(StatusKind::Failure, message.into());
    }

    fn emit(&self, kind: StatusKind, message: String) {
        tracing::debug!(kind = ?kind, message = %message, "Status update");
        if let Some(tx) = &self.tx {
            // UI shell gone (page navigated away); nothing left to inform
            let _ = tx.send(StatusEvent { kind, message });
        }
    }
}
