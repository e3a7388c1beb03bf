//! # fieldseal
//!
//! Operator-side key provisioning and field encryption for managed devices.
//!
//! A device ships with a long-term P-256 key pair; the operator tool builds
//! a 128-bit field key shared with it, then encrypts configuration fields
//! under AES-128-CTR for transfer. Two paths populate the key:
//!
//! * **Fresh derivation** — generate an ephemeral P-256 pair, run ECDH
//!   against the device's public key, and derive the field key with
//!   HMAC-SHA256 over a fixed label. The ephemeral public key is exported
//!   back to the device so it can derive the same key.
//! * **Reuse** — load a previously exported field key directly.
//!
//! All key material is wiped on mode change, reset, and drop.
//!
//! ```no_run
//! use std::sync::Arc;
//! use fieldseal::{Mode, Session, SubmitOutcome};
//! use fieldseal::notify::TracingSink;
//!
//! # async fn run(device_key_base64: &str) -> Result<(), fieldseal::ProtocolError> {
//! let session = Session::new(Arc::new(TracingSink));
//! session.select_mode(Mode::GenerateNew).await;
//!
//! if let SubmitOutcome::Ready(Some(exports)) =
//!     session.submit_device_public_key(device_key_base64).await?
//! {
//!     // Transfer the operator public key to the device; store the field
//!     // key for later sessions.
//!     println!("{}", exports.operator_public_base64);
//!     println!("{}", exports.field_key_base64);
//! }
//!
//! let sealed = session.encrypt_field("wifi-passphrase").await?;
//! # let _ = sealed;
//! # Ok(())
//! # }
//! ```

pub mod cipher;
pub mod codec;
pub mod error;
pub mod exchange;
pub mod kdf;
pub mod notify;
pub mod precheck;
pub mod session;

pub use error::ProtocolError;
pub use kdf::FieldKey;
pub use notify::{Notification, NotificationSink, Severity};
pub use precheck::Preconditions;
pub use session::{KeyExports, Mode, Session, SessionStatus, SubmitOutcome};
