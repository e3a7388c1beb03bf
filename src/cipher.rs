//! Field encryption: AES-128-CTR with a fresh random IV per call.
//!
//! Output layout: IV[16] || ciphertext[len(plaintext)]. The IV is used
//! directly as the initial 128-bit counter block (no nonce/counter split) —
//! a protocol constant dictated by the device firmware.
//!
//! Device-side contract (decryption is performed by the device, not here):
//! split the first 16 bytes off as the counter block and decrypt the
//! remainder with the same key under AES-128-CTR.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;
use ctr::Ctr128BE;
use getrandom::getrandom;

use crate::codec::IV_BYTES;
use crate::error::ProtocolError;
use crate::kdf::FieldKey;

type Aes128Ctr = Ctr128BE<Aes128>;

/// Draw a random 16-byte IV. Every encryption call draws its own; there is
/// deliberately no entry point that accepts a caller-supplied IV.
fn fresh_iv() -> Result<[u8; IV_BYTES], ProtocolError> {
    let mut iv = [0u8; IV_BYTES];
    getrandom(&mut iv).map_err(|_| ProtocolError::CipherBackend)?;
    Ok(iv)
}

/// Encrypt a field value, returning IV || ciphertext.
///
/// Plaintext of any byte length is accepted, including empty.
pub fn encrypt_field(key: &FieldKey, plaintext: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let iv = fresh_iv()?;
    let mut out = Vec::with_capacity(IV_BYTES + plaintext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(plaintext);

    let mut cipher = Aes128Ctr::new(key.as_bytes().into(), (&iv).into());
    cipher
        .try_apply_keystream(&mut out[IV_BYTES..])
        .map_err(|_| ProtocolError::CipherBackend)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf;

    fn test_key() -> FieldKey {
        kdf::derive_field_key(&[0x42u8; 32]).unwrap()
    }

    #[test]
    fn output_layout() {
        let sealed = encrypt_field(&test_key(), b"hello").unwrap();
        assert_eq!(sealed.len(), IV_BYTES + 5);
    }

    #[test]
    fn empty_plaintext_is_iv_only() {
        let sealed = encrypt_field(&test_key(), b"").unwrap();
        assert_eq!(sealed.len(), IV_BYTES);
    }

    #[test]
    fn ivs_never_repeat_across_calls() {
        let key = test_key();
        let a = encrypt_field(&key, b"same input").unwrap();
        let b = encrypt_field(&key, b"same input").unwrap();
        assert_ne!(a[..IV_BYTES], b[..IV_BYTES]);
        assert_ne!(a, b);
    }
}
