//! Error types for the provisioning protocol.

use std::fmt;

/// Everything that can go wrong between "paste a key" and "ciphertext out".
///
/// Each operation maps backend failures onto exactly one of these kinds at
/// its own boundary; callers surface them as non-fatal notifications and the
/// session state is left untouched so the user can retry with corrected
/// input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Advisory environment problem (insecure transport, missing backend).
    /// Never blocks an operation.
    EnvironmentPrecondition(String),
    /// Malformed base64, or a decoded length that does not match the
    /// protocol's fixed sizes.
    InvalidKeyFormat(String),
    /// The decoded bytes are not a valid P-256 point (off-curve, identity).
    InvalidKeyPoint,
    /// ECDH produced unusable output.
    KeyAgreement,
    /// Key generation or RNG failure, or an unresponsive backend.
    CryptoBackend(String),
    /// The cipher rejected the key or the encryption operation.
    CipherBackend,
    /// A session operation was invoked in a state that does not accept it.
    InvalidTransition { state: &'static str, op: &'static str },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvironmentPrecondition(msg) => write!(f, "environment precondition: {}", msg),
            Self::InvalidKeyFormat(msg) => write!(f, "invalid key format: {}", msg),
            Self::InvalidKeyPoint => write!(f, "invalid key point"),
            Self::KeyAgreement => write!(f, "key agreement failed"),
            Self::CryptoBackend(msg) => write!(f, "crypto backend error: {}", msg),
            Self::CipherBackend => write!(f, "cipher backend failure"),
            Self::InvalidTransition { state, op } => {
                write!(f, "invalid transition: {} not accepted in state {}", op, state)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}
