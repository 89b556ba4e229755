// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Secret container.
//!
//! A [`Secret`] owns sensitive bytes in a pinned, zero-on-drop buffer. The
//! bytes never appear in logs, `Debug` output, or error messages; callers read
//! them out only through [`Secret::write_into`] with a buffer of exactly the
//! right size.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use zeroize::Zeroize;

use super::error::CryptoError;
use super::memlock::LockedBuffer;
use super::rng;

enum Storage {
    Empty,
    Locked(LockedBuffer),
}

/// An opaque byte string held in locked memory.
pub struct Secret {
    storage: Storage,
}

impl Secret {
    /// Creates a secret of `len` fresh random bytes.
    pub fn random(len: usize) -> Result<Self, CryptoError> {
        let mut secret = Self::zeroed(len)?;
        if let Storage::Locked(buffer) = &mut secret.storage {
            rng::fill(buffer.as_mut_slice())?;
        }
        Ok(secret)
    }

    /// Creates a secret by copying `bytes` into locked memory.
    ///
    /// The caller still owns the source slice and is responsible for zeroizing
    /// it if it is sensitive.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let mut secret = Self::zeroed(bytes.len())?;
        if let Storage::Locked(buffer) = &mut secret.storage {
            buffer.as_mut_slice().copy_from_slice(bytes);
        }
        Ok(secret)
    }

    /// Imports a secret from standard base64. The intermediate decode buffer
    /// is zeroized before return.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::MalformedDescriptor(format!("invalid base64: {e}")))?;
        let secret = Self::from_bytes(&decoded);
        decoded.zeroize();
        secret
    }

    fn zeroed(len: usize) -> Result<Self, CryptoError> {
        let storage = if len == 0 {
            Storage::Empty
        } else {
            Storage::Locked(LockedBuffer::new(len).ok_or(CryptoError::Allocation)?)
        };
        Ok(Self { storage })
    }

    /// Length of the secret in bytes.
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Empty => 0,
            Storage::Locked(buffer) => buffer.len(),
        }
    }

    /// Returns true for a zero-length secret.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the secret into `dest`, which must be exactly `len()` bytes.
    pub fn write_into(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        if dest.len() != self.len() {
            return Err(CryptoError::BufferLengthMismatch {
                expected: self.len(),
                got: dest.len(),
            });
        }
        dest.copy_from_slice(self.as_bytes());
        Ok(())
    }

    /// Raw view for key derivation. Never exposed outside the crate.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Empty => &[],
            Storage::Locked(buffer) => buffer.as_slice(),
        }
    }

    /// Standard base64 of the secret, for descriptor serialization only.
    pub(crate) fn to_base64(&self) -> String {
        BASE64.encode(self.as_bytes())
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_secret_has_requested_length() {
        let secret = Secret::random(64).unwrap();
        assert_eq!(secret.len(), 64);
        assert!(!secret.is_empty());
    }

    #[test]
    fn from_bytes_round_trips() {
        let secret = Secret::from_bytes(&[7u8; 32]).unwrap();
        let mut out = [0u8; 32];
        secret.write_into(&mut out).unwrap();
        assert_eq!(out, [7u8; 32]);
    }

    #[test]
    fn write_into_rejects_wrong_length() {
        let secret = Secret::from_bytes(&[1, 2, 3]).unwrap();
        let mut out = [0u8; 4];
        let result = secret.write_into(&mut out);
        assert!(matches!(
            result,
            Err(CryptoError::BufferLengthMismatch {
                expected: 3,
                got: 4
            })
        ));
    }

    #[test]
    fn base64_round_trips() {
        let original = Secret::random(64).unwrap();
        let encoded = original.to_base64();
        let decoded = Secret::from_base64(&encoded).unwrap();
        assert_eq!(original.as_bytes(), decoded.as_bytes());
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let result = Secret::from_base64("not-valid-base64!!!");
        assert!(matches!(result, Err(CryptoError::MalformedDescriptor(_))));
    }

    #[test]
    fn zero_length_secret_is_allowed() {
        let secret = Secret::from_bytes(&[]).unwrap();
        assert_eq!(secret.len(), 0);
        let mut out = [0u8; 0];
        secret.write_into(&mut out).unwrap();
    }

    #[test]
    fn debug_output_is_redacted() {
        let secret = Secret::from_bytes(&[0x42; 16]).unwrap();
        let debug = format!("{:?}", secret);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("42"));
    }
}
