//! Key exchange: ephemeral P-256 key pair + ECDH with the device's
//! long-term public key.
//!
//! The device's key arrives as 64 raw bytes (X || Y, base64); the operator's
//! ephemeral public key is exported the same way for transfer back to the
//! device. The private scalar never leaves this module.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

use crate::codec::{self, RAW_POINT_BYTES, SHARED_SECRET_BYTES};
use crate::error::ProtocolError;

// ---------------------------------------------------------------------------
// Device public key import
// ---------------------------------------------------------------------------

/// Decode and validate the device's public key.
///
/// Expects base64 of exactly 64 raw point bytes; the uncompressed-format
/// prefix is reattached before the SEC1 parse. Returns `InvalidKeyFormat`
/// for decode/length problems and `InvalidKeyPoint` when the bytes do not
/// name a valid curve point (off-curve, identity).
pub fn import_device_public_key(device_key_base64: &str) -> Result<PublicKey, ProtocolError> {
    let decoded = codec::decode_base64_exact(device_key_base64, RAW_POINT_BYTES)?;
    let raw: [u8; RAW_POINT_BYTES] = decoded
        .try_into()
        .map_err(|_| ProtocolError::InvalidKeyFormat("raw point conversion".into()))?;
    let point = codec::to_uncompressed_point(&raw);
    PublicKey::from_sec1_bytes(&point).map_err(|_| ProtocolError::InvalidKeyPoint)
}

/// Export a public key as 64 raw point bytes (prefix stripped).
pub fn export_public_key_raw(public: &PublicKey) -> Result<[u8; RAW_POINT_BYTES], ProtocolError> {
    let encoded = public.to_encoded_point(false);
    codec::from_uncompressed_point(encoded.as_bytes())
}

// ---------------------------------------------------------------------------
// Ephemeral key pair
// ---------------------------------------------------------------------------

/// Operator-side ephemeral key pair, generated once per fresh-key flow.
pub struct EphemeralKeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a fresh key pair from the system RNG.
    ///
    /// Scalars are rejection-sampled; a draw outside the group order is
    /// discarded and retried, so the loop terminates after one iteration
    /// except with negligible probability.
    pub fn generate() -> Result<Self, ProtocolError> {
        for _ in 0..64 {
            let mut seed = Zeroizing::new([0u8; 32]);
            OsRng
                .try_fill_bytes(&mut seed[..])
                .map_err(|e| ProtocolError::CryptoBackend(e.to_string()))?;
            if let Ok(secret) = SecretKey::from_slice(&seed[..]) {
                let public = secret.public_key();
                return Ok(Self { secret, public });
            }
        }
        Err(ProtocolError::CryptoBackend(
            "no valid scalar after 64 draws".into(),
        ))
    }

    /// Reconstruct a key pair from a stored scalar. Used for
    /// interoperability checks against device firmware vectors.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, ProtocolError> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| ProtocolError::InvalidKeyPoint)?;
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// The public point as 64 raw bytes for display/transfer.
    pub fn public_raw(&self) -> Result<[u8; RAW_POINT_BYTES], ProtocolError> {
        export_public_key_raw(&self.public)
    }

    /// ECDH with the device's public key. The 32-byte shared secret is
    /// returned in a wiping buffer; it exists only long enough to feed the
    /// KDF.
    pub fn diffie_hellman(
        &self,
        device_public: &PublicKey,
    ) -> Result<Zeroizing<[u8; SHARED_SECRET_BYTES]>, ProtocolError> {
        let shared =
            p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), device_public.as_affine());
        let raw = shared.raw_secret_bytes();
        if raw.len() != SHARED_SECRET_BYTES {
            return Err(ProtocolError::KeyAgreement);
        }
        let mut out = Zeroizing::new([0u8; SHARED_SECRET_BYTES]);
        out.copy_from_slice(raw.as_slice());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_public_key_roundtrips() {
        let pair = EphemeralKeyPair::generate().unwrap();
        let raw = pair.public_raw().unwrap();
        let b64 = codec::encode_base64(&raw);
        let imported = import_device_public_key(&b64).unwrap();
        assert_eq!(export_public_key_raw(&imported).unwrap(), raw);
    }

    #[test]
    fn both_sides_agree() {
        let operator = EphemeralKeyPair::generate().unwrap();
        let device = EphemeralKeyPair::generate().unwrap();

        let a = operator.diffie_hellman(device.public_key()).unwrap();
        let b = device.diffie_hellman(operator.public_key()).unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn zero_point_rejected() {
        let b64 = codec::encode_base64(&[0u8; RAW_POINT_BYTES]);
        assert_eq!(
            import_device_public_key(&b64),
            Err(ProtocolError::InvalidKeyPoint)
        );
    }

    #[test]
    fn short_input_rejected_as_format() {
        let b64 = codec::encode_base64(&[0u8; 63]);
        assert!(matches!(
            import_device_public_key(&b64),
            Err(ProtocolError::InvalidKeyFormat(_))
        ));
    }
}
