// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! AES-GCM authenticated encryptor.
//!
//! Like the CBC variant, every payload runs under a one-shot subkey:
//!
//! ```text
//! key_modifier (16) <- RNG        nonce (12) <- RNG
//! enc_key    = KDF(master, label = aad, context = key_modifier || nonce)
//! ciphertext = AES-GCM(enc_key, nonce, plaintext)
//! ```
//!
//! The caller's authenticated data binds through the KDF label, so the cipher
//! itself runs with empty AAD. Fresh random subkeys per message also mean the
//! 96-bit nonce is never reused under one AES key.
//!
//! # Payload layout
//!
//! ```text
//! ┌───────────────────┬────────────┬───────────────────┬──────────┐
//! │ key modifier (16) │ nonce (12) │ ciphertext (n)    │ tag (16) │
//! └───────────────────┴────────────┴───────────────────┴──────────┘
//! ```

use std::sync::Arc;

use aes::Aes192;
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};
use zeroize::Zeroize;

use super::algorithms::EncryptionAlgorithm;
use super::error::CryptoError;
use super::secret::Secret;
use super::{kdf, rng, AuthenticatedEncryptor, KEY_MODIFIER_SIZE, MASTER_SECRET_MIN_SIZE};

type Aes192Gcm = AesGcm<Aes192, U12>;

/// GCM nonce size in bytes (96 bits).
const NONCE_SIZE: usize = 12;

/// GCM authentication tag size in bytes.
const TAG_SIZE: usize = 16;

/// Encrypts and authenticates with AES-GCM over derived subkeys.
pub struct GcmEncryptor {
    encryption: EncryptionAlgorithm,
    master: Arc<Secret>,
}

impl GcmEncryptor {
    /// Creates an encryptor. `encryption` must be a GCM identifier and the
    /// master secret must be at least 512 bits.
    pub fn new(encryption: EncryptionAlgorithm, master: Arc<Secret>) -> Result<Self, CryptoError> {
        if !encryption.is_gcm() {
            return Err(CryptoError::WrongAlgorithmFamily(
                encryption.as_str().to_string(),
            ));
        }
        if master.len() < MASTER_SECRET_MIN_SIZE {
            return Err(CryptoError::MasterSecretTooShort {
                expected: MASTER_SECRET_MIN_SIZE,
                got: master.len(),
            });
        }
        Ok(Self { encryption, master })
    }

    fn derive_subkey(&self, key_modifier: &[u8], nonce: &[u8], aad: &[u8]) -> Vec<u8> {
        let mut context = Vec::with_capacity(key_modifier.len() + nonce.len());
        context.extend_from_slice(key_modifier);
        context.extend_from_slice(nonce);
        kdf::derive(
            self.master.as_bytes(),
            aad,
            &context,
            self.encryption.key_size(),
        )
    }

    fn seal(&self, key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload {
            msg: plaintext,
            aad: &[],
        };
        let sealed = match self.encryption {
            EncryptionAlgorithm::Aes128Gcm => Aes128Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::Failed)?
                .encrypt(nonce, payload),
            EncryptionAlgorithm::Aes192Gcm => Aes192Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::Failed)?
                .encrypt(nonce, payload),
            EncryptionAlgorithm::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::Failed)?
                .encrypt(nonce, payload),
            _ => return Err(CryptoError::Failed),
        };
        sealed.map_err(|_| CryptoError::Failed)
    }

    fn open(&self, key: &[u8], nonce: &[u8], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload {
            msg: sealed,
            aad: &[],
        };
        let opened = match self.encryption {
            EncryptionAlgorithm::Aes128Gcm => Aes128Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::Failed)?
                .decrypt(nonce, payload),
            EncryptionAlgorithm::Aes192Gcm => Aes192Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::Failed)?
                .decrypt(nonce, payload),
            EncryptionAlgorithm::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::Failed)?
                .decrypt(nonce, payload),
            _ => return Err(CryptoError::Failed),
        };
        opened.map_err(|_| CryptoError::Failed)
    }
}

impl AuthenticatedEncryptor for GcmEncryptor {
    fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut key_modifier = [0u8; KEY_MODIFIER_SIZE];
        rng::fill(&mut key_modifier)?;
        let mut nonce = [0u8; NONCE_SIZE];
        rng::fill(&mut nonce)?;

        let mut subkey = self.derive_subkey(&key_modifier, &nonce, aad);
        let sealed = self.seal(&subkey, &nonce, plaintext);
        subkey.zeroize();
        let sealed = sealed?;

        let mut output = Vec::with_capacity(KEY_MODIFIER_SIZE + NONCE_SIZE + sealed.len());
        output.extend_from_slice(&key_modifier);
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&sealed);
        Ok(output)
    }

    fn decrypt(&self, payload: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if payload.len() < KEY_MODIFIER_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Failed);
        }

        let key_modifier = &payload[..KEY_MODIFIER_SIZE];
        let nonce = &payload[KEY_MODIFIER_SIZE..KEY_MODIFIER_SIZE + NONCE_SIZE];
        let sealed = &payload[KEY_MODIFIER_SIZE + NONCE_SIZE..];

        let mut subkey = self.derive_subkey(key_modifier, nonce, aad);
        let result = self.open(&subkey, nonce, sealed);
        subkey.zeroize();
        result
    }
}

impl std::fmt::Debug for GcmEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcmEncryptor")
            .field("encryption", &self.encryption)
            .field("master", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encryptor(encryption: EncryptionAlgorithm) -> GcmEncryptor {
        let master = Arc::new(Secret::random(64).unwrap());
        GcmEncryptor::new(encryption, master).unwrap()
    }

    #[test]
    fn round_trip_all_key_sizes() {
        let plaintext = b"sealed bytes";
        let aad = b"context";
        for encryption in [
            EncryptionAlgorithm::Aes128Gcm,
            EncryptionAlgorithm::Aes192Gcm,
            EncryptionAlgorithm::Aes256Gcm,
        ] {
            let enc = encryptor(encryption);
            let payload = enc.encrypt(plaintext, aad).unwrap();
            assert_eq!(enc.decrypt(&payload, aad).unwrap(), plaintext);
        }
    }

    #[test]
    fn payload_layout_has_expected_length() {
        let enc = encryptor(EncryptionAlgorithm::Aes256Gcm);
        let payload = enc.encrypt(&[1, 2, 3, 4, 5], b"aad").unwrap();
        assert_eq!(payload.len(), 16 + 12 + 5 + 16);
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let enc = encryptor(EncryptionAlgorithm::Aes128Gcm);
        let payload = enc.encrypt(&[], b"aad").unwrap();
        assert_eq!(payload.len(), 16 + 12 + 16);
        assert_eq!(enc.decrypt(&payload, b"aad").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn any_flipped_byte_fails() {
        let enc = encryptor(EncryptionAlgorithm::Aes256Gcm);
        let payload = enc.encrypt(b"payload bytes", b"aad").unwrap();
        for i in 0..payload.len() {
            let mut tampered = payload.clone();
            tampered[i] ^= 0x01;
            assert!(
                matches!(enc.decrypt(&tampered, b"aad"), Err(CryptoError::Failed)),
                "byte {i} flip must fail"
            );
        }
    }

    #[test]
    fn different_aad_fails() {
        let enc = encryptor(EncryptionAlgorithm::Aes192Gcm);
        let payload = enc.encrypt(b"payload", b"aad one").unwrap();
        assert!(matches!(
            enc.decrypt(&payload, b"aad two"),
            Err(CryptoError::Failed)
        ));
    }

    #[test]
    fn truncated_payload_fails() {
        let enc = encryptor(EncryptionAlgorithm::Aes256Gcm);
        assert!(matches!(
            enc.decrypt(&[0u8; 16 + 12 + 15], b"aad"),
            Err(CryptoError::Failed)
        ));
    }

    #[test]
    fn cbc_identifier_is_rejected() {
        let master = Arc::new(Secret::random(64).unwrap());
        let result = GcmEncryptor::new(EncryptionAlgorithm::Aes256Cbc, master);
        assert!(matches!(result, Err(CryptoError::WrongAlgorithmFamily(_))));
    }

    #[test]
    fn short_master_secret_is_rejected() {
        let master = Arc::new(Secret::random(63).unwrap());
        let result = GcmEncryptor::new(EncryptionAlgorithm::Aes128Gcm, master);
        assert!(matches!(
            result,
            Err(CryptoError::MasterSecretTooShort { .. })
        ));
    }
}
