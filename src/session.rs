//! Session orchestration: the state machine that sequences key import,
//! derivation, and field encryption.
//!
//! ```text
//! IDLE ──select_mode──▶ AWAITING_DEVICE_KEY ──submit──▶ KEYS_READY
//!   │                   AWAITING_SYMMETRIC_KEY ─submit─▶    │
//!   ◀──────────────────────── reset ────────────────────────┘
//! ```
//!
//! Each variant carries only the data valid in that state; a ready-looking
//! session without a key cannot be constructed. Every `select_mode` and
//! `reset` advances an epoch counter, and a derivation that completes under
//! a stale epoch is discarded without touching the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinError;

use crate::cipher;
use crate::codec;
use crate::error::ProtocolError;
use crate::exchange::{self, EphemeralKeyPair};
use crate::kdf::{self, FieldKey};
use crate::notify::{Notification, NotificationSink, TracingSink};
use crate::precheck::Preconditions;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Which path populates the field key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Derive a fresh key from the device's public key.
    GenerateNew,
    /// Reuse a key exported from a previous session.
    UseExisting,
}

/// Observable session state, for the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    AwaitingDeviceKey,
    AwaitingSymmetricKey,
    KeysReady,
}

/// Handles surfaced after a fresh derivation: the operator public key for
/// transfer to the device, and the field key for operator storage.
#[derive(Clone, Debug)]
pub struct KeyExports {
    pub operator_public_base64: String,
    pub field_key_base64: String,
}

/// Result of a submit operation.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Keys are active. The fresh-derivation path carries exports; the
    /// reuse path carries none.
    Ready(Option<KeyExports>),
    /// A mode change or reset advanced the epoch while the derivation was
    /// in flight; the result was discarded and the session is unchanged.
    Superseded,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

enum State {
    Idle,
    AwaitingDeviceKey,
    AwaitingSymmetricKey,
    KeysReady {
        key: FieldKey,
        // Present only when this session derived the key itself.
        operator_public: Option<[u8; codec::RAW_POINT_BYTES]>,
    },
}

impl State {
    fn status(&self) -> SessionStatus {
        match self {
            State::Idle => SessionStatus::Idle,
            State::AwaitingDeviceKey => SessionStatus::AwaitingDeviceKey,
            State::AwaitingSymmetricKey => SessionStatus::AwaitingSymmetricKey,
            State::KeysReady { .. } => SessionStatus::KeysReady,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::AwaitingDeviceKey => "awaiting-device-key",
            State::AwaitingSymmetricKey => "awaiting-symmetric-key",
            State::KeysReady { .. } => "keys-ready",
        }
    }
}

struct Inner {
    epoch: u64,
    state: State,
}

/// Output of the fresh-derivation chain, tagged for epoch checking by the
/// caller.
struct Derived {
    key: FieldKey,
    operator_public: [u8; codec::RAW_POINT_BYTES],
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One operator interaction. Owns all key material; dropping the session
/// (or calling [`Session::reset`]) wipes it.
pub struct Session {
    inner: Mutex<Inner>,
    sink: Arc<dyn NotificationSink>,
    preconditions: Preconditions,
    backend_timeout: Option<Duration>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl Session {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                epoch: 0,
                state: State::Idle,
            }),
            sink,
            preconditions: Preconditions::default(),
            backend_timeout: None,
        }
    }

    /// Describe the host environment; unmet preconditions are advised on
    /// every operation but never block it.
    pub fn with_preconditions(mut self, preconditions: Preconditions) -> Self {
        self.preconditions = preconditions;
        self
    }

    /// Bound backend calls; expiry surfaces as a `CryptoBackend` error.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.backend_timeout = Some(limit);
        self
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.lock().await.state.status()
    }

    pub async fn epoch(&self) -> u64 {
        self.inner.lock().await.epoch
    }

    /// The exported operator public key, when this session derived its own
    /// key. Lets the presentation layer re-render it without re-deriving.
    pub async fn operator_public_base64(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        match &inner.state {
            State::KeysReady {
                operator_public: Some(public),
                ..
            } => Some(codec::encode_base64(public)),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Select which path populates the field key. Wipes any current key
    /// material and advances the epoch.
    pub async fn select_mode(&self, mode: Mode) {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        // Replacing the state drops any held FieldKey, which wipes it.
        inner.state = match mode {
            Mode::GenerateNew => State::AwaitingDeviceKey,
            Mode::UseExisting => State::AwaitingSymmetricKey,
        };
        tracing::debug!(epoch = inner.epoch, mode = ?mode, "mode selected");
    }

    /// Wipe all key material and return to the initial state.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        inner.state = State::Idle;
        tracing::debug!(epoch = inner.epoch, "session reset");
    }

    /// Run the fresh-derivation chain: import the device key, generate an
    /// ephemeral pair, agree on a shared secret, derive the field key.
    ///
    /// Valid only in `AwaitingDeviceKey`. On success the session moves to
    /// `KeysReady` and the exports are returned; on failure the session is
    /// unchanged and the error is also surfaced as a Danger notification.
    pub async fn submit_device_public_key(
        &self,
        device_key_base64: &str,
    ) -> Result<SubmitOutcome, ProtocolError> {
        self.preconditions.advise(self.sink.as_ref());
        let epoch = self
            .expect_state(SessionStatus::AwaitingDeviceKey, "submit_device_public_key")
            .await?;

        let input = device_key_base64.to_owned();
        let derived = self
            .run_backend(move || {
                let device_public = exchange::import_device_public_key(&input)?;
                let pair = EphemeralKeyPair::generate()?;
                let shared = pair.diffie_hellman(&device_public)?;
                let key = kdf::derive_field_key(&shared)?;
                Ok(Derived {
                    key,
                    operator_public: pair.public_raw()?,
                })
            })
            .await;

        let derived = match derived {
            Ok(d) => d,
            Err(e) => {
                self.sink.notify(Notification::danger(
                    "The device public key is invalid. Please review it and try again.",
                ));
                return Err(e);
            }
        };

        let outcome = self
            .install_key(epoch, derived.key, Some(derived.operator_public))
            .await;
        if matches!(outcome, SubmitOutcome::Ready(_)) {
            self.sink.notify(Notification::info(
                "New server public key & encryption key successfully generated",
            ));
        }
        Ok(outcome)
    }

    /// Load a field key exported from a previous session.
    ///
    /// Valid only in `AwaitingSymmetricKey`. Same epoch discipline as the
    /// fresh-derivation path; the reuse path surfaces no exports.
    pub async fn submit_field_key(
        &self,
        key_base64: &str,
    ) -> Result<SubmitOutcome, ProtocolError> {
        self.preconditions.advise(self.sink.as_ref());
        let epoch = self
            .expect_state(SessionStatus::AwaitingSymmetricKey, "submit_field_key")
            .await?;

        let input = key_base64.to_owned();
        let key = match self.run_backend(move || kdf::import_field_key(&input)).await {
            Ok(key) => key,
            Err(e) => {
                self.sink.notify(Notification::danger(
                    "The encryption key is invalid. Please review it and try again.",
                ));
                return Err(e);
            }
        };

        let outcome = self.install_key(epoch, key, None).await;
        if matches!(outcome, SubmitOutcome::Ready(_)) {
            self.sink
                .notify(Notification::info("Encryption key loaded"));
        }
        Ok(outcome)
    }

    /// Encrypt one field value under the active key; returns base64 of
    /// IV || ciphertext. Valid only in `KeysReady`; repeatable, and the
    /// state does not change.
    pub async fn encrypt_field(&self, plaintext: &str) -> Result<String, ProtocolError> {
        self.preconditions.advise(self.sink.as_ref());

        // Clone the key under a short lock so back-to-back encrypts can run
        // concurrently, each with its own IV draw.
        let key = {
            let inner = self.inner.lock().await;
            match &inner.state {
                State::KeysReady { key, .. } => key.clone(),
                other => {
                    return Err(ProtocolError::InvalidTransition {
                        state: other.name(),
                        op: "encrypt_field",
                    })
                }
            }
        };

        let bytes = plaintext.as_bytes().to_vec();
        match self
            .run_backend(move || cipher::encrypt_field(&key, &bytes))
            .await
        {
            Ok(sealed) => Ok(codec::encode_base64(&sealed)),
            Err(e) => {
                self.sink
                    .notify(Notification::danger(format!("Encryption failed: {}", e)));
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn expect_state(
        &self,
        want: SessionStatus,
        op: &'static str,
    ) -> Result<u64, ProtocolError> {
        let inner = self.inner.lock().await;
        if inner.state.status() != want {
            return Err(ProtocolError::InvalidTransition {
                state: inner.state.name(),
                op,
            });
        }
        Ok(inner.epoch)
    }

    /// Apply a derived or imported key, but only if `epoch` is still
    /// current; a stale result is dropped silently.
    async fn install_key(
        &self,
        epoch: u64,
        key: FieldKey,
        operator_public: Option<[u8; codec::RAW_POINT_BYTES]>,
    ) -> SubmitOutcome {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            tracing::debug!(
                requested = epoch,
                current = inner.epoch,
                "stale derivation discarded"
            );
            return SubmitOutcome::Superseded;
        }
        let exports = operator_public.map(|public| KeyExports {
            operator_public_base64: codec::encode_base64(&public),
            field_key_base64: key.to_base64(),
        });
        inner.state = State::KeysReady {
            key,
            operator_public,
        };
        tracing::debug!(epoch = inner.epoch, "keys ready");
        SubmitOutcome::Ready(exports)
    }

    /// Run a crypto-backend call off the lock, bounded by the configured
    /// timeout.
    async fn run_backend<T, F>(&self, f: F) -> Result<T, ProtocolError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ProtocolError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        let joined: Result<Result<T, ProtocolError>, JoinError> = match self.backend_timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    return Err(ProtocolError::CryptoBackend(
                        "backend call timed out".into(),
                    ))
                }
            },
            None => task.await,
        };
        match joined {
            Ok(result) => result,
            Err(e) => Err(ProtocolError::CryptoBackend(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
