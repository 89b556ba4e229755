// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Crypto error types.

/// Errors from the cryptographic layer.
///
/// Configuration problems (bad algorithm name, short master secret) carry
/// enough detail to diagnose at startup. Every failure on the decrypt path
/// collapses into [`CryptoError::Failed`] with one uniform message so callers
/// cannot distinguish a bad tag from a truncated payload or a wrong key.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Algorithm identifier outside the supported set.
    #[error("unknown algorithm identifier: {0}")]
    UnknownAlgorithm(String),

    /// Algorithm identifier valid but not usable by this encryptor family.
    #[error("algorithm {0} is not valid here")]
    WrongAlgorithmFamily(String),

    /// Master secret shorter than the required minimum.
    #[error("master secret too short: expected at least {expected} bytes, got {got}")]
    MasterSecretTooShort { expected: usize, got: usize },

    /// Destination buffer length does not match the secret length.
    #[error("buffer length mismatch: expected {expected}, got {got}")]
    BufferLengthMismatch { expected: usize, got: usize },

    /// Descriptor XML could not be interpreted.
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// Descriptor XML names a deserializer nobody registered.
    #[error("unknown descriptor deserializer: {0}")]
    UnknownDeserializer(String),

    /// The platform randomness source failed.
    #[error("randomness source failure")]
    Randomness,

    /// Locked memory for a secret could not be allocated.
    #[error("secret allocation failed")]
    Allocation,

    /// The single opaque failure for every protect/unprotect error.
    #[error("cryptographic operation failed")]
    Failed,
}
