//! Advisory environment preconditions.
//!
//! Unencrypted transports and missing crypto backends are worth warning
//! about, but operators sometimes work on air-gapped bench setups where
//! the checks misfire. Advisories are notifications, never errors.

use crate::notify::{Notification, NotificationSink};

/// The caller's description of the host environment.
#[derive(Clone, Copy, Debug)]
pub struct Preconditions {
    /// Whether the channel carrying keys and ciphertext is encrypted.
    pub secure_transport: bool,
    /// Whether the platform crypto backend is known to be available.
    pub backend_available: bool,
}

impl Default for Preconditions {
    fn default() -> Self {
        Self {
            secure_transport: true,
            backend_available: true,
        }
    }
}

impl Preconditions {
    /// Emit an advisory notification for every unmet precondition.
    ///
    /// Returns `true` when all preconditions hold. The return value is
    /// informational only; callers proceed either way.
    pub fn advise(&self, sink: &dyn NotificationSink) -> bool {
        if !self.secure_transport {
            sink.notify(Notification::warning(
                "The encryption tool is not supported over an unencrypted transport - \
                 please use an encrypted channel.",
            ));
        }
        if !self.backend_available {
            sink.notify(Notification::danger(
                "The cryptographic backend is not available on this host.",
            ));
        }
        self.secure_transport && self.backend_available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{InMemorySink, Severity};

    #[test]
    fn all_met_emits_nothing() {
        let sink = InMemorySink::new();
        assert!(Preconditions::default().advise(&sink));
        assert!(sink.is_empty());
    }

    #[test]
    fn unmet_preconditions_warn_but_do_not_block() {
        let sink = InMemorySink::new();
        let env = Preconditions {
            secure_transport: false,
            backend_available: false,
        };
        assert!(!env.advise(&sink));

        let notices = sink.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].severity, Severity::Warning);
        assert_eq!(notices[1].severity, Severity::Danger);
    }
}
