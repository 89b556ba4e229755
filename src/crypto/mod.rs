// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic core: secret container, subkey derivation, and the two
//! authenticated encryptor families.
//!
//! Every payload is protected under one-shot subkeys derived from a key's
//! master secret, with the caller's authenticated-data bytes folded into the
//! derivation. Randomness comes exclusively from [`rng`]; secrets live in
//! locked, zero-on-drop buffers.

mod algorithms;
mod cbc;
mod error;
mod gcm;
mod kdf;
mod memlock;
mod rng;
mod secret;

pub use self::algorithms::{EncryptionAlgorithm, ValidationAlgorithm};
pub use self::cbc::CbcHmacEncryptor;
pub use self::error::CryptoError;
pub use self::gcm::GcmEncryptor;
pub use self::secret::Secret;

/// Minimum master secret length in bytes (512 bits).
pub const MASTER_SECRET_MIN_SIZE: usize = 64;

/// Per-payload random key modifier length in bytes.
pub const KEY_MODIFIER_SIZE: usize = 16;

/// Authenticated encryption over an additional-authenticated-data context.
///
/// Implementations are immutable once built and safe to share across threads;
/// a single instance serves all payloads protected under one key.
pub trait AuthenticatedEncryptor: Send + Sync {
    /// Protects `plaintext`, binding `aad` into the result's integrity.
    fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Recovers the plaintext of `payload`. Fails with the uniform
    /// [`CryptoError::Failed`] if the payload was not produced under the same
    /// master secret and `aad`.
    fn decrypt(&self, payload: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError>;
}
