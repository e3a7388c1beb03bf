//! User-facing notifications: every operation outcome is reported through a
//! pluggable sink so the presentation layer can render alert banners.

use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Alert level, matching the banner styles the presentation layer renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

/// A user-visible, non-fatal message.
#[derive(Clone, Debug)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Danger,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// Where notifications go. Implement this for your UI layer.
///
/// Synchronous to avoid the `async_trait` dependency.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

// ---------------------------------------------------------------------------
// Built-in sinks
// ---------------------------------------------------------------------------

/// Logs notifications via the `tracing` crate.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => tracing::info!(message = %notification.message, "notice"),
            Severity::Warning => tracing::warn!(message = %notification.message, "notice"),
            Severity::Danger => tracing::error!(message = %notification.message, "notice"),
        }
    }
}

/// Collects notifications in memory (for testing and the UI layer).
pub struct InMemorySink {
    notices: Mutex<Vec<Notification>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn notices(&self) -> Vec<Notification> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.notices.lock().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for InMemorySink {
    fn notify(&self, notification: Notification) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_sink_records_in_order() {
        let sink = InMemorySink::new();
        sink.notify(Notification::info("first"));
        sink.notify(Notification::danger("second"));

        let notices = sink.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].severity, Severity::Info);
        assert_eq!(notices[1].severity, Severity::Danger);
        assert_eq!(notices[1].message, "second");
    }
}
