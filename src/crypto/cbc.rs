// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! CBC-then-HMAC authenticated encryptor.
//!
//! Each payload derives fresh subkeys from the master secret, so no AES or
//! HMAC key is ever used for more than one message:
//!
//! ```text
//! key_modifier (16) <- RNG        iv (16) <- RNG
//! enc_key || mac_key = KDF(master, label = aad, context = key_modifier || iv)
//! ciphertext = AES-CBC(enc_key, iv, plaintext)      [PKCS7]
//! tag        = HMAC(mac_key, key_modifier || iv || ciphertext)
//! ```
//!
//! # Payload layout
//!
//! ```text
//! ┌───────────────────┬─────────┬──────────────────────┬──────────────┐
//! │ key modifier (16) │ iv (16) │ ciphertext (n*16)    │ tag (32/64)  │
//! └───────────────────┴─────────┴──────────────────────┴──────────────┘
//! ```

use std::sync::Arc;

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use zeroize::Zeroize;

use super::algorithms::{EncryptionAlgorithm, ValidationAlgorithm};
use super::error::CryptoError;
use super::secret::Secret;
use super::{kdf, rng, AuthenticatedEncryptor, KEY_MODIFIER_SIZE, MASTER_SECRET_MIN_SIZE};

/// AES block and IV size in bytes.
const IV_SIZE: usize = 16;

/// Encrypts with AES-CBC and authenticates with HMAC over derived subkeys.
pub struct CbcHmacEncryptor {
    encryption: EncryptionAlgorithm,
    validation: ValidationAlgorithm,
    master: Arc<Secret>,
}

impl CbcHmacEncryptor {
    /// Creates an encryptor. `encryption` must be a CBC identifier and the
    /// master secret must be at least 512 bits.
    pub fn new(
        encryption: EncryptionAlgorithm,
        validation: ValidationAlgorithm,
        master: Arc<Secret>,
    ) -> Result<Self, CryptoError> {
        if !encryption.is_cbc() {
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
        Ok(Self {
            encryption,
            validation,
            master,
        })
    }

    fn derive_subkeys(&self, key_modifier: &[u8], iv: &[u8], aad: &[u8]) -> Vec<u8> {
        let mut context = Vec::with_capacity(key_modifier.len() + iv.len());
        context.extend_from_slice(key_modifier);
        context.extend_from_slice(iv);
        kdf::derive(
            self.master.as_bytes(),
            aad,
            &context,
            self.encryption.key_size() + self.validation.tag_size(),
        )
    }

    fn encrypt_blocks(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let ciphertext = match self.encryption {
            EncryptionAlgorithm::Aes128Cbc => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::Failed)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            EncryptionAlgorithm::Aes192Cbc => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::Failed)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            EncryptionAlgorithm::Aes256Cbc => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::Failed)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            _ => return Err(CryptoError::Failed),
        };
        Ok(ciphertext)
    }

    fn decrypt_blocks(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let plaintext = match self.encryption {
            EncryptionAlgorithm::Aes128Cbc => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::Failed)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| CryptoError::Failed)?,
            EncryptionAlgorithm::Aes192Cbc => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::Failed)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| CryptoError::Failed)?,
            EncryptionAlgorithm::Aes256Cbc => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::Failed)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| CryptoError::Failed)?,
            _ => return Err(CryptoError::Failed),
        };
        Ok(plaintext)
    }

    fn compute_tag(&self, mac_key: &[u8], data: &[u8]) -> Vec<u8> {
        match self.validation {
            ValidationAlgorithm::HmacSha256 => {
                let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(mac_key) else {
                    unreachable!("HMAC accepts keys of any length");
                };
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            ValidationAlgorithm::HmacSha512 => {
                let Ok(mut mac) = Hmac::<Sha512>::new_from_slice(mac_key) else {
                    unreachable!("HMAC accepts keys of any length");
                };
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// Constant-time tag check.
    fn verify_tag(&self, mac_key: &[u8], data: &[u8], tag: &[u8]) -> Result<(), CryptoError> {
        let result = match self.validation {
            ValidationAlgorithm::HmacSha256 => {
                let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(mac_key) else {
                    unreachable!("HMAC accepts keys of any length");
                };
                mac.update(data);
                mac.verify_slice(tag)
            }
            ValidationAlgorithm::HmacSha512 => {
                let Ok(mut mac) = Hmac::<Sha512>::new_from_slice(mac_key) else {
                    unreachable!("HMAC accepts keys of any length");
                };
                mac.update(data);
                mac.verify_slice(tag)
            }
        };
        result.map_err(|_| CryptoError::Failed)
    }
}

impl AuthenticatedEncryptor for CbcHmacEncryptor {
    fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut key_modifier = [0u8; KEY_MODIFIER_SIZE];
        rng::fill(&mut key_modifier)?;
        let mut iv = [0u8; IV_SIZE];
        rng::fill(&mut iv)?;

        let enc_len = self.encryption.key_size();
        let mut subkeys = self.derive_subkeys(&key_modifier, &iv, aad);
        let (enc_key, mac_key) = subkeys.split_at(enc_len);

        let ciphertext = self.encrypt_blocks(enc_key, &iv, plaintext)?;

        let mut output = Vec::with_capacity(
            KEY_MODIFIER_SIZE + IV_SIZE + ciphertext.len() + self.validation.tag_size(),
        );
        output.extend_from_slice(&key_modifier);
        output.extend_from_slice(&iv);
        output.extend_from_slice(&ciphertext);
        let tag = self.compute_tag(mac_key, &output);
        output.extend_from_slice(&tag);

        subkeys.zeroize();
        Ok(output)
    }

    fn decrypt(&self, payload: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let tag_len = self.validation.tag_size();
        // At minimum one padded block of ciphertext.
        if payload.len() < KEY_MODIFIER_SIZE + IV_SIZE + 16 + tag_len {
            return Err(CryptoError::Failed);
        }

        let (authenticated, tag) = payload.split_at(payload.len() - tag_len);
        let key_modifier = &authenticated[..KEY_MODIFIER_SIZE];
        let iv = &authenticated[KEY_MODIFIER_SIZE..KEY_MODIFIER_SIZE + IV_SIZE];
        let ciphertext = &authenticated[KEY_MODIFIER_SIZE + IV_SIZE..];

        let enc_len = self.encryption.key_size();
        let mut subkeys = self.derive_subkeys(key_modifier, iv, aad);
        let (enc_key, mac_key) = subkeys.split_at(enc_len);

        let result = self
            .verify_tag(mac_key, authenticated, tag)
            .and_then(|()| self.decrypt_blocks(enc_key, iv, ciphertext));

        subkeys.zeroize();
        result
    }
}

impl std::fmt::Debug for CbcHmacEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CbcHmacEncryptor")
            .field("encryption", &self.encryption)
            .field("validation", &self.validation)
            .field("master", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encryptor(
        encryption: EncryptionAlgorithm,
        validation: ValidationAlgorithm,
    ) -> CbcHmacEncryptor {
        let master = Arc::new(Secret::random(64).unwrap());
        CbcHmacEncryptor::new(encryption, validation, master).unwrap()
    }

    #[test]
    fn round_trip_all_configurations() {
        let plaintext = b"attack at dawn";
        let aad = b"context bytes";
        for encryption in [
            EncryptionAlgorithm::Aes128Cbc,
            EncryptionAlgorithm::Aes192Cbc,
            EncryptionAlgorithm::Aes256Cbc,
        ] {
            for validation in [ValidationAlgorithm::HmacSha256, ValidationAlgorithm::HmacSha512] {
                let enc = encryptor(encryption, validation);
                let payload = enc.encrypt(plaintext, aad).unwrap();
                assert_eq!(enc.decrypt(&payload, aad).unwrap(), plaintext);
            }
        }
    }

    #[test]
    fn payload_layout_has_expected_length() {
        let enc = encryptor(EncryptionAlgorithm::Aes256Cbc, ValidationAlgorithm::HmacSha512);
        // 5 bytes of plaintext pad to one 16-byte block.
        let payload = enc.encrypt(&[1, 2, 3, 4, 5], b"aad").unwrap();
        assert_eq!(payload.len(), 16 + 16 + 16 + 64);
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let enc = encryptor(EncryptionAlgorithm::Aes128Cbc, ValidationAlgorithm::HmacSha256);
        let payload = enc.encrypt(&[], b"aad").unwrap();
        assert_eq!(enc.decrypt(&payload, b"aad").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn any_flipped_byte_fails() {
        let enc = encryptor(EncryptionAlgorithm::Aes256Cbc, ValidationAlgorithm::HmacSha256);
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
        let enc = encryptor(EncryptionAlgorithm::Aes256Cbc, ValidationAlgorithm::HmacSha512);
        let payload = enc.encrypt(b"payload", b"aad one").unwrap();
        assert!(matches!(
            enc.decrypt(&payload, b"aad two"),
            Err(CryptoError::Failed)
        ));
    }

    #[test]
    fn truncated_payload_fails() {
        let enc = encryptor(EncryptionAlgorithm::Aes256Cbc, ValidationAlgorithm::HmacSha512);
        let payload = enc.encrypt(b"payload", b"aad").unwrap();
        assert!(matches!(
            enc.decrypt(&payload[..payload.len() - 1], b"aad"),
            Err(CryptoError::Failed)
        ));
        assert!(matches!(enc.decrypt(&[], b"aad"), Err(CryptoError::Failed)));
    }

    #[test]
    fn payloads_are_unique_per_call() {
        let enc = encryptor(EncryptionAlgorithm::Aes256Cbc, ValidationAlgorithm::HmacSha256);
        let a = enc.encrypt(b"same plaintext", b"aad").unwrap();
        let b = enc.encrypt(b"same plaintext", b"aad").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn gcm_identifier_is_rejected() {
        let master = Arc::new(Secret::random(64).unwrap());
        let result = CbcHmacEncryptor::new(
            EncryptionAlgorithm::Aes256Gcm,
            ValidationAlgorithm::HmacSha256,
            master,
        );
        assert!(matches!(result, Err(CryptoError::WrongAlgorithmFamily(_))));
    }

    #[test]
    fn short_master_secret_is_rejected() {
        let master = Arc::new(Secret::random(32).unwrap());
        let result = CbcHmacEncryptor::new(
            EncryptionAlgorithm::Aes256Cbc,
            ValidationAlgorithm::HmacSha256,
            master,
        );
        assert!(matches!(
            result,
            Err(CryptoError::MasterSecretTooShort { expected: 64, got: 32 })
        ));
    }
}
