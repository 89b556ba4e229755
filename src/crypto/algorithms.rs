// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! The closed set of supported algorithm identifiers.
//!
//! Identifier strings are part of the persisted descriptor format and must
//! never change. Anything outside this set is a configuration error.

use std::fmt;
use std::str::FromStr;

use super::error::CryptoError;

/// Symmetric encryption algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes192Gcm,
    Aes256Gcm,
}

impl EncryptionAlgorithm {
    /// All supported identifiers, in wire-name order.
    pub const ALL: [EncryptionAlgorithm; 6] = [
        EncryptionAlgorithm::Aes128Cbc,
        EncryptionAlgorithm::Aes192Cbc,
        EncryptionAlgorithm::Aes256Cbc,
        EncryptionAlgorithm::Aes128Gcm,
        EncryptionAlgorithm::Aes192Gcm,
        EncryptionAlgorithm::Aes256Gcm,
    ];

    /// The persisted identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionAlgorithm::Aes128Cbc => "AES_128_CBC",
            EncryptionAlgorithm::Aes192Cbc => "AES_192_CBC",
            EncryptionAlgorithm::Aes256Cbc => "AES_256_CBC",
            EncryptionAlgorithm::Aes128Gcm => "AES_128_GCM",
            EncryptionAlgorithm::Aes192Gcm => "AES_192_GCM",
            EncryptionAlgorithm::Aes256Gcm => "AES_256_GCM",
        }
    }

    /// Symmetric key size in bytes.
    pub fn key_size(&self) -> usize {
        match self {
            EncryptionAlgorithm::Aes128Cbc | EncryptionAlgorithm::Aes128Gcm => 16,
            EncryptionAlgorithm::Aes192Cbc | EncryptionAlgorithm::Aes192Gcm => 24,
            EncryptionAlgorithm::Aes256Cbc | EncryptionAlgorithm::Aes256Gcm => 32,
        }
    }

    /// True for the CBC family.
    pub fn is_cbc(&self) -> bool {
        matches!(
            self,
            EncryptionAlgorithm::Aes128Cbc
                | EncryptionAlgorithm::Aes192Cbc
                | EncryptionAlgorithm::Aes256Cbc
        )
    }

    /// True for the GCM family.
    pub fn is_gcm(&self) -> bool {
        !self.is_cbc()
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EncryptionAlgorithm::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CryptoError::UnknownAlgorithm(s.to_string()))
    }
}

/// MAC algorithms for the CBC-then-HMAC encryptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationAlgorithm {
    HmacSha256,
    HmacSha512,
}

impl ValidationAlgorithm {
    /// The persisted identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationAlgorithm::HmacSha256 => "HMACSHA256",
            ValidationAlgorithm::HmacSha512 => "HMACSHA512",
        }
    }

    /// Tag length in bytes. The derived MAC key uses the same length.
    pub fn tag_size(&self) -> usize {
        match self {
            ValidationAlgorithm::HmacSha256 => 32,
            ValidationAlgorithm::HmacSha512 => 64,
        }
    }
}

impl fmt::Display for ValidationAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HMACSHA256" => Ok(ValidationAlgorithm::HmacSha256),
            "HMACSHA512" => Ok(ValidationAlgorithm::HmacSha512),
            other => Err(CryptoError::UnknownAlgorithm(other.to_string())),
        }
    }
}
