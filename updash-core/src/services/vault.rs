//! Token vault - authenticated encryption of API tokens at rest
//!
//! AES-256-GCM with a fresh random 16-byte IV per call and a detached 16-byte
//! tag. IV, ciphertext and tag are stored hex-encoded, separately.
//!
//! Nothing in this module logs. Decryption failures carry no detail on
//! purpose: callers only learn that the stored token is unusable.

use std::fmt;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::domain::result::{Error, Result};
use crate::domain::{EncryptedSecret, AUTH_TAG_LENGTH, IV_LENGTH};

/// AES-256 requires a 32-byte key
pub const KEY_LENGTH: usize = 32;

/// AES-256-GCM with a 128-bit nonce
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// The stored token could not be decrypted
///
/// Covers tag mismatch, wrong key, malformed hex and wrong field lengths
/// without saying which.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("stored token could not be decrypted")]
pub struct DecryptionFailure;

impl From<DecryptionFailure> for Error {
    fn from(_: DecryptionFailure) -> Self {
        Error::DecryptionFailed
    }
}

/// Validated 32-byte vault key, wiped on drop
pub struct VaultKey(Zeroizing<Vec<u8>>);

impl VaultKey {
    /// Parse a hex-encoded key
    ///
    /// Anything other than exactly 64 hex characters is a configuration error.
    /// The error never repeats the key itself.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let trimmed = hex_key.trim();
        let bytes = Zeroizing::new(hex::decode(trimmed).map_err(|_| {
            Error::config("UP_TOKEN_ENCRYPTION_KEY is not valid hex")
        })?);
        if bytes.len() != KEY_LENGTH {
            return Err(Error::config(format!(
                "Invalid UP_TOKEN_ENCRYPTION_KEY length. Expected {} hex characters ({} bytes), but got {} characters ({} bytes).",
                KEY_LENGTH * 2,
                KEY_LENGTH,
                trimmed.len(),
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Generate a random key
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; KEY_LENGTH]);
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0.as_slice()))
    }

    /// Short identifier for diagnostics: first 8 hex chars of SHA-256(key)
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_slice());
        hex::encode(&digest[..4])
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultKey({})", self.fingerprint())
    }
}

/// Encrypts and decrypts API tokens with a process-wide key
///
/// Read-only after construction; share it behind an `Arc`.
pub struct TokenVault {
    cipher: Aes256Gcm16,
    fingerprint: String,
}

impl TokenVault {
    pub fn new(key: &VaultKey) -> Result<Self> {
        let cipher = Aes256Gcm16::new_from_slice(key.0.as_slice())
            .map_err(|_| Error::config("Encryption key has the wrong length"))?;
        Ok(Self {
            cipher,
            fingerprint: key.fingerprint(),
        })
    }

    pub fn from_hex(hex_key: &str) -> Result<Self> {
        Self::new(&VaultKey::from_hex(hex_key)?)
    }

    /// Fingerprint of the key this vault was built with
    pub fn key_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Encrypt a token under a fresh random IV
    ///
    /// A failure here means the vault itself is broken and should be treated
    /// as fatal by the caller.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret> {
        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let mut buffer = Zeroizing::new(plaintext.as_bytes().to_vec());
        let tag = self
            .cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| Error::Encryption("Failed to encrypt token".to_string()))?;

        Ok(EncryptedSecret {
            iv: hex::encode(iv),
            encrypted_token: hex::encode(buffer.as_slice()),
            auth_tag: hex::encode(tag),
        })
    }

    /// Verify the tag and decrypt
    ///
    /// Plaintext is only released once the tag has verified.
    pub fn decrypt(&self, secret: &EncryptedSecret) -> std::result::Result<String, DecryptionFailure> {
        let iv = hex::decode(&secret.iv).map_err(|_| DecryptionFailure)?;
        let tag = hex::decode(&secret.auth_tag).map_err(|_| DecryptionFailure)?;
        if iv.len() != IV_LENGTH || tag.len() != AUTH_TAG_LENGTH {
            return Err(DecryptionFailure);
        }

        let mut buffer =
            Zeroizing::new(hex::decode(&secret.encrypted_token).map_err(|_| DecryptionFailure)?);
        self.cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(&iv),
                b"",
                &mut buffer,
                GenericArray::from_slice(&tag),
            )
            .map_err(|_| DecryptionFailure)?;

        String::from_utf8(buffer.to_vec()).map_err(|_| DecryptionFailure)
    }
}

impl fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVault")
            .field("key_fingerprint", &self.fingerprint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn vault() -> TokenVault {
        TokenVault::from_hex(TEST_KEY).unwrap()
    }

    /// Flip the lowest bit of the byte at `index` in a hex string
    fn flip_bit(hex_str: &str, index: usize) -> String {
        let mut bytes = hex::decode(hex_str).unwrap();
        bytes[index] ^= 0x01;
        hex::encode(bytes)
    }

    #[test]
    fn test_round_trip() {
        let vault = vault();
        for plaintext in ["up:yeah:abc123", "", "emoji 🦀 and ünïcödé", &"x".repeat(4096)] {
            let secret = vault.encrypt(plaintext).unwrap();
            assert_eq!(vault.decrypt(&secret).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_output_lengths() {
        let secret = vault().encrypt("up:yeah:abc").unwrap();
        assert_eq!(secret.iv.len(), IV_LENGTH * 2);
        assert_eq!(secret.auth_tag.len(), AUTH_TAG_LENGTH * 2);
        assert_eq!(secret.encrypted_token.len(), "up:yeah:abc".len() * 2);
    }

    #[test]
    fn test_fresh_iv_every_call() {
        let vault = vault();
        let a = vault.encrypt("up:yeah:same").unwrap();
        let b = vault.encrypt("up:yeah:same").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.encrypted_token, b.encrypted_token);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let vault = vault();
        let secret = vault.encrypt("up:yeah:tamper-me").unwrap();
        for i in 0..("up:yeah:tamper-me".len()) {
            let tampered = EncryptedSecret {
                encrypted_token: flip_bit(&secret.encrypted_token, i),
                ..secret.clone()
            };
            assert_eq!(vault.decrypt(&tampered), Err(DecryptionFailure));
        }
    }

    #[test]
    fn test_tampered_tag_fails() {
        let vault = vault();
        let secret = vault.encrypt("up:yeah:tamper-me").unwrap();
        for i in 0..AUTH_TAG_LENGTH {
            let tampered = EncryptedSecret {
                auth_tag: flip_bit(&secret.auth_tag, i),
                ..secret.clone()
            };
            assert_eq!(vault.decrypt(&tampered), Err(DecryptionFailure));
        }
    }

    #[test]
    fn test_tampered_iv_fails() {
        let vault = vault();
        let secret = vault.encrypt("up:yeah:tamper-me").unwrap();
        for i in 0..IV_LENGTH {
            let tampered = EncryptedSecret {
                iv: flip_bit(&secret.iv, i),
                ..secret.clone()
            };
            assert_eq!(vault.decrypt(&tampered), Err(DecryptionFailure));
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let secret = vault().encrypt("up:yeah:abc").unwrap();
        let other = TokenVault::new(&VaultKey::generate()).unwrap();
        assert_eq!(other.decrypt(&secret), Err(DecryptionFailure));
    }

    #[test]
    fn test_malformed_fields_fail() {
        let vault = vault();
        let secret = vault.encrypt("up:yeah:abc").unwrap();

        let bad_hex = EncryptedSecret {
            encrypted_token: "zz".to_string(),
            ..secret.clone()
        };
        assert_eq!(vault.decrypt(&bad_hex), Err(DecryptionFailure));

        let short_iv = EncryptedSecret {
            iv: "00ff".to_string(),
            ..secret.clone()
        };
        assert_eq!(vault.decrypt(&short_iv), Err(DecryptionFailure));

        let short_tag = EncryptedSecret {
            auth_tag: secret.auth_tag[..10].to_string(),
            ..secret
        };
        assert_eq!(vault.decrypt(&short_tag), Err(DecryptionFailure));
    }

    #[test]
    fn test_key_must_be_32_bytes() {
        assert!(matches!(VaultKey::from_hex("abcd"), Err(Error::Config(_))));
        assert!(matches!(
            VaultKey::from_hex(&format!("{}00", TEST_KEY)),
            Err(Error::Config(_))
        ));
        assert!(matches!(VaultKey::from_hex("not hex at all"), Err(Error::Config(_))));
        assert!(VaultKey::from_hex(&"07".repeat(31)).is_err());
        assert!(VaultKey::from_hex(&"07".repeat(32)).is_ok());
    }

    #[test]
    fn test_key_error_does_not_echo_key() {
        let bad = "deadbeefdeadbeef";
        let err = VaultKey::from_hex(bad).unwrap_err().to_string();
        assert!(!err.contains(bad));
        assert!(err.contains("16 characters"));
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let key = VaultKey::from_hex(TEST_KEY).unwrap();
        let debug = format!("{:?} {:?}", key, TokenVault::new(&key).unwrap());
        assert!(!debug.contains(TEST_KEY));
        assert!(debug.contains(&key.fingerprint()));
        assert_eq!(key.fingerprint().len(), 8);
    }

    #[test]
    fn test_generated_key_round_trips_through_hex() {
        let key = VaultKey::generate();
        let again = VaultKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key.fingerprint(), again.fingerprint());
    }
}
