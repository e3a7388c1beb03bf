//! Wire encoding shared with the device firmware.
//!
//! Key points travel as 64 raw bytes (X || Y, big-endian), i.e. the X9.62
//! uncompressed form with the leading `0x04` stripped. All byte strings are
//! carried as standard base64 with padding.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::ProtocolError;

// ---------------------------------------------------------------------------
// Protocol constants (must match the device firmware byte-for-byte)
// ---------------------------------------------------------------------------

/// Raw P-256 point: X[32] || Y[32], no prefix byte.
pub const RAW_POINT_BYTES: usize = 64;

/// X9.62 uncompressed point: 0x04 || X[32] || Y[32].
pub const UNCOMPRESSED_POINT_BYTES: usize = RAW_POINT_BYTES + 1; // 65

/// X9.62 uncompressed-format prefix byte.
pub const UNCOMPRESSED_PREFIX: u8 = 0x04;

/// ECDH output size.
pub const SHARED_SECRET_BYTES: usize = 32;

/// AES-128 field-encryption key size.
pub const FIELD_KEY_BYTES: usize = 16;

/// Per-message IV, used directly as the initial CTR counter block.
pub const IV_BYTES: usize = 16;

/// Fixed KDF label, shared out of band with the device firmware.
pub const KDF_LABEL: &[u8] = b"config";

// ---------------------------------------------------------------------------
// Base64
// ---------------------------------------------------------------------------

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64 and require an exact decoded length.
pub fn decode_base64_exact(input: &str, expected_len: usize) -> Result<Vec<u8>, ProtocolError> {
    let bytes = STANDARD
        .decode(input)
        .map_err(|_| ProtocolError::InvalidKeyFormat("not valid base64".into()))?;
    if bytes.len() != expected_len {
        return Err(ProtocolError::InvalidKeyFormat(format!(
            "decoded length {}, expected {}",
            bytes.len(),
            expected_len
        )));
    }
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Point framing
// ---------------------------------------------------------------------------

/// Prepend the uncompressed-format prefix to a raw X || Y point.
pub fn to_uncompressed_point(raw: &[u8; RAW_POINT_BYTES]) -> [u8; UNCOMPRESSED_POINT_BYTES] {
    let mut out = [0u8; UNCOMPRESSED_POINT_BYTES];
    out[0] = UNCOMPRESSED_PREFIX;
    out[1..].copy_from_slice(raw);
    out
}

/// Strip the uncompressed-format prefix, yielding the raw X || Y point.
pub fn from_uncompressed_point(point: &[u8]) -> Result<[u8; RAW_POINT_BYTES], ProtocolError> {
    if point.len() != UNCOMPRESSED_POINT_BYTES {
        return Err(ProtocolError::InvalidKeyFormat(format!(
            "point length {}, expected {}",
            point.len(),
            UNCOMPRESSED_POINT_BYTES
        )));
    }
    if point[0] != UNCOMPRESSED_PREFIX {
        return Err(ProtocolError::InvalidKeyFormat(format!(
            "point prefix {:#04x}, expected 0x04",
            point[0]
        )));
    }
    let mut out = [0u8; RAW_POINT_BYTES];
    out.copy_from_slice(&point[1..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_roundtrip() {
        let bytes: Vec<u8> = (0u8..64).collect();
        let encoded = encode_base64(&bytes);
        assert_eq!(decode_base64_exact(&encoded, 64).unwrap(), bytes);
    }

    #[test]
    fn base64_wrong_length_rejected() {
        let encoded = encode_base64(&[0u8; 63]);
        assert!(matches!(
            decode_base64_exact(&encoded, 64),
            Err(ProtocolError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn base64_garbage_rejected() {
        assert!(matches!(
            decode_base64_exact("not base64 at all!!", 64),
            Err(ProtocolError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn point_framing_roundtrip() {
        let mut raw = [0u8; RAW_POINT_BYTES];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = i as u8;
        }
        let framed = to_uncompressed_point(&raw);
        assert_eq!(framed[0], UNCOMPRESSED_PREFIX);
        assert_eq!(from_uncompressed_point(&framed).unwrap(), raw);
    }

    #[test]
    fn bad_prefix_rejected() {
        let mut framed = to_uncompressed_point(&[0u8; RAW_POINT_BYTES]);
        framed[0] = 0x02;
        assert!(matches!(
            from_uncompressed_point(&framed),
            Err(ProtocolError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn short_point_rejected() {
        assert!(from_uncompressed_point(&[UNCOMPRESSED_PREFIX; 64]).is_err());
    }
}
