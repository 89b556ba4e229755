// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Public error surface of the protection API.

use crate::crypto::CryptoError;
use crate::keyring::KeyRingError;

/// Errors surfaced by [`super::DataProtector`].
///
/// Cryptographic failures are deliberately opaque: a bad tag, a truncated
/// payload, an unknown key id, and a refused revoked key all surface as the
/// same [`ProtectionError::Cryptographic`] with one uniform message.
#[derive(Debug, thiserror::Error)]
pub enum ProtectionError {
    /// Bad algorithm identifier, malformed descriptor, invalid settings.
    /// Loud and specific; raised at startup or first use.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The key repository failed and no cached snapshot could cover for it.
    #[error("key repository failure: {0}")]
    Repository(String),

    /// The single opaque failure for everything on the unprotect path.
    #[error("cryptographic operation failed")]
    Cryptographic,

    /// Programmer error in the call itself; raised before any work happens.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<KeyRingError> for ProtectionError {
    fn from(err: KeyRingError) -> Self {
        match err {
            KeyRingError::Repository(e) => ProtectionError::Repository(e.to_string()),
            KeyRingError::RebuildTimeout => {
                ProtectionError::Repository("key ring rebuild timed out".to_string())
            }
            KeyRingError::Crypto(e) => e.into(),
            other => ProtectionError::Configuration(other.to_string()),
        }
    }
}

impl From<CryptoError> for ProtectionError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Randomness | CryptoError::Failed => ProtectionError::Cryptographic,
            CryptoError::UnknownAlgorithm(_)
            | CryptoError::WrongAlgorithmFamily(_)
            | CryptoError::MasterSecretTooShort { .. }
            | CryptoError::BufferLengthMismatch { .. }
            | CryptoError::MalformedDescriptor(_)
            | CryptoError::UnknownDeserializer(_)
            | CryptoError::Allocation => ProtectionError::Configuration(err.to_string()),
        }
    }
}
