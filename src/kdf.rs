//! Key derivation: HMAC-SHA256 over the fixed `"config"` label.
//!
//! key = HMAC-SHA256(key = shared_secret[32], msg = "config")[..16]
//!
//! The label and the 16-byte truncation are protocol constants baked into
//! the device firmware; the derivation is deterministic so re-running the
//! exchange with the same key pair reproduces the same field key.

use core::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec::{self, FIELD_KEY_BYTES, KDF_LABEL, SHARED_SECRET_BYTES};
use crate::error::ProtocolError;

type HmacSha256 = Hmac<Sha256>;

/// The 16-byte symmetric key that encrypts field values.
///
/// Created by [`derive_field_key`] or [`import_field_key`]; wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FieldKey([u8; FIELD_KEY_BYTES]);

impl FieldKey {
    pub fn as_bytes(&self) -> &[u8; FIELD_KEY_BYTES] {
        &self.0
    }

    /// Base64 form, suitable for operator storage and later reuse.
    pub fn to_base64(&self) -> String {
        codec::encode_base64(&self.0)
    }
}

impl fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldKey(..)")
    }
}

/// Derive the field key from an ECDH shared secret.
///
/// Deterministic: the same shared secret always yields the same key.
pub fn derive_field_key(
    shared_secret: &[u8; SHARED_SECRET_BYTES],
) -> Result<FieldKey, ProtocolError> {
    let mut mac = HmacSha256::new_from_slice(shared_secret)
        .map_err(|_| ProtocolError::CryptoBackend("HMAC key setup rejected".into()))?;
    mac.update(KDF_LABEL);
    let digest = mac.finalize().into_bytes();
    let mut key = [0u8; FIELD_KEY_BYTES];
    key.copy_from_slice(&digest[..FIELD_KEY_BYTES]);
    Ok(FieldKey(key))
}

/// Import a previously exported field key (base64, exactly 16 bytes).
pub fn import_field_key(key_base64: &str) -> Result<FieldKey, ProtocolError> {
    let bytes = codec::decode_base64_exact(key_base64, FIELD_KEY_BYTES)?;
    let mut key = [0u8; FIELD_KEY_BYTES];
    key.copy_from_slice(&bytes);
    Ok(FieldKey(key))
}
