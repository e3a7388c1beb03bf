//! Roundtrip tests: everything sealed here must open on the device side.
//! Decryption is reproduced the way the firmware does it (split the IV off,
//! run CTR with the shared key).

use aes::cipher::{KeyIvInit, StreamCipher};
use proptest::prelude::*;

use fieldseal::cipher::encrypt_field;
use fieldseal::codec::{self, FIELD_KEY_BYTES, IV_BYTES, RAW_POINT_BYTES};
use fieldseal::exchange::EphemeralKeyPair;
use fieldseal::kdf::{self, FieldKey};
use fieldseal::ProtocolError;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

fn device_open(key: &FieldKey, sealed: &[u8]) -> Vec<u8> {
    assert!(sealed.len() >= IV_BYTES);
    let (iv, ct) = sealed.split_at(IV_BYTES);
    let iv: [u8; IV_BYTES] = iv.try_into().unwrap();
    let mut out = ct.to_vec();
    let mut cipher = Aes128Ctr::new(key.as_bytes().into(), &iv.into());
    cipher.apply_keystream(&mut out);
    out
}

fn session_key() -> FieldKey {
    let operator = EphemeralKeyPair::generate().unwrap();
    let device = EphemeralKeyPair::generate().unwrap();
    let shared = operator.diffie_hellman(device.public_key()).unwrap();
    kdf::derive_field_key(&shared).unwrap()
}

#[test]
fn seal_then_open() {
    let key = session_key();
    for plaintext in [
        &b""[..],
        b"x",
        b"wifi-passphrase",
        "naïve café ☕".as_bytes(),
        &[0u8; 1024],
    ] {
        let sealed = encrypt_field(&key, plaintext).unwrap();
        assert_eq!(sealed.len(), IV_BYTES + plaintext.len());
        assert_eq!(device_open(&key, &sealed), plaintext);
    }
}

#[test]
fn exported_key_opens_what_the_session_sealed() {
    let key = session_key();
    let exported = key.to_base64();
    let sealed = encrypt_field(&key, b"provisioning secret").unwrap();

    let reloaded = kdf::import_field_key(&exported).unwrap();
    assert_eq!(device_open(&reloaded, &sealed), b"provisioning secret");
}

#[test]
fn wrong_key_does_not_open() {
    let key = session_key();
    let other = session_key();
    let sealed = encrypt_field(&key, b"provisioning secret").unwrap();
    assert_ne!(device_open(&other, &sealed), b"provisioning secret");
}

proptest! {
    #[test]
    fn arbitrary_plaintext_roundtrips(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
        let key = kdf::derive_field_key(&[0x5au8; 32]).unwrap();
        let sealed = encrypt_field(&key, &plaintext).unwrap();
        prop_assert_eq!(sealed.len(), IV_BYTES + plaintext.len());
        prop_assert_eq!(device_open(&key, &sealed), plaintext);
    }

    #[test]
    fn wrong_length_point_rejected(len in 0usize..128) {
        prop_assume!(len != RAW_POINT_BYTES);
        let b64 = codec::encode_base64(&vec![1u8; len]);
        let err = fieldseal::exchange::import_device_public_key(&b64).unwrap_err();
        prop_assert!(matches!(err, ProtocolError::InvalidKeyFormat(_)));
    }

    #[test]
    fn wrong_length_key_rejected(len in 0usize..64) {
        prop_assume!(len != FIELD_KEY_BYTES);
        let b64 = codec::encode_base64(&vec![2u8; len]);
        let err = kdf::import_field_key(&b64).unwrap_err();
        prop_assert!(matches!(err, ProtocolError::InvalidKeyFormat(_)));
    }
}
