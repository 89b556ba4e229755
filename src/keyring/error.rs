// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Key-ring error types.

use crate::crypto::CryptoError;
use crate::xml::XmlError;

/// Errors from a key repository backend.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Reading or writing the element store failed.
    #[error("repository I/O failure: {0}")]
    Io(String),

    /// The backend is not reachable at all.
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Io(err.to_string())
    }
}

/// Errors from key management and ring resolution.
#[derive(Debug, thiserror::Error)]
pub enum KeyRingError {
    /// The repository failed. Absorbed by the provider while a previous
    /// snapshot exists; surfaced only when there is nothing to serve.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A persisted key or revocation element does not have the expected shape.
    #[error("malformed key element: {0}")]
    MalformedElement(String),

    /// Invalid configuration; fails loudly at startup or first use.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No key is usable as the default and a replacement could not be made.
    #[error("no default key available")]
    NoDefaultKey,

    /// A concurrent rebuild did not finish within the wait deadline.
    #[error("key ring rebuild timed out")]
    RebuildTimeout,

    /// Cryptographic layer failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// XML plumbing failure.
    #[error(transparent)]
    Xml(#[from] XmlError),
}
