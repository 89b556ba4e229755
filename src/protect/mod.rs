// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! The public protection API: purpose-scoped protect and unprotect.
//!
//! A [`DataProtector`] carries an ordered chain of purpose strings. The chain
//! is hashed (length-prefixed, SHA-512) into the additional authenticated
//! data of every payload, together with the magic header and the protecting
//! key's id. Decryption under a different chain, in any element or order,
//! fails authentication.

mod error;
mod payload;

use std::sync::Arc;

use sha2::{Digest, Sha512};
use tracing::debug;
use uuid::Uuid;

use crate::clock::SystemClock;
use crate::keyring::audit::{AuditEvent, AuditLogger, KeyRingOperation};
use crate::keyring::{KeyRepository, KeyRingConfig, KeyRingProvider, XmlKeyManager};

pub use error::ProtectionError;
pub use payload::MAGIC_HEADER;

use payload::HEADER_SIZE;

/// Purpose digest length (SHA-512).
const PURPOSE_DIGEST_SIZE: usize = 64;

/// Additional-authenticated-data length: magic, key id, purpose digest.
const AAD_SIZE: usize = HEADER_SIZE + PURPOSE_DIGEST_SIZE;

/// Whether [`DataProtector::unprotect_raw`] may decrypt under a revoked key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowRevoked {
    No,
    Yes,
}

/// What [`DataProtector::unprotect_raw`] learned about a payload's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnprotectInfo {
    /// The key the payload was protected under.
    pub key_id: Uuid,
    /// The key has been revoked; decryption required [`AllowRevoked::Yes`].
    pub was_revoked: bool,
    /// The payload should be re-protected: its key is revoked or is no
    /// longer the ring's default.
    pub requires_migration: bool,
}

/// Root of the protection API; hands out purpose-scoped protectors over one
/// shared key ring.
pub struct DataProtectionProvider {
    keyring: Arc<KeyRingProvider>,
}

impl DataProtectionProvider {
    /// Wraps an already-wired key-ring provider.
    pub fn new(keyring: Arc<KeyRingProvider>) -> Self {
        Self { keyring }
    }

    /// Convenience constructor: default wiring (pass-through at-rest
    /// encryption, system clock) over the given repository.
    pub fn with_repository(
        repository: Arc<dyn KeyRepository>,
        config: KeyRingConfig,
    ) -> Result<Self, ProtectionError> {
        let manager = Arc::new(XmlKeyManager::new(repository, config.clone())?);
        let keyring = Arc::new(KeyRingProvider::new(
            manager,
            &config,
            Arc::new(SystemClock),
        )?);
        Ok(Self::new(keyring))
    }

    /// The underlying key-ring provider, for invalidation and inspection.
    pub fn keyring(&self) -> &Arc<KeyRingProvider> {
        &self.keyring
    }

    /// Creates a protector rooted at `purpose`.
    pub fn create_protector(
        &self,
        purpose: impl Into<String>,
    ) -> Result<DataProtector, ProtectionError> {
        DataProtector::with_chain(Arc::clone(&self.keyring), vec![purpose.into()])
    }
}

/// Protects and unprotects payloads under one purpose chain.
pub struct DataProtector {
    keyring: Arc<KeyRingProvider>,
    purposes: Vec<String>,
    purpose_digest: [u8; PURPOSE_DIGEST_SIZE],
    audit: AuditLogger,
}

impl DataProtector {
    fn with_chain(
        keyring: Arc<KeyRingProvider>,
        purposes: Vec<String>,
    ) -> Result<Self, ProtectionError> {
        if purposes.is_empty() {
            return Err(ProtectionError::InvalidArgument(
                "purpose chain must not be empty".to_string(),
            ));
        }
        if purposes.iter().any(String::is_empty) {
            return Err(ProtectionError::InvalidArgument(
                "purpose strings must not be empty".to_string(),
            ));
        }

        let purpose_digest = digest_purposes(&purposes);
        Ok(Self {
            keyring,
            purposes,
            purpose_digest,
            audit: AuditLogger::new("protector"),
        })
    }

    /// Creates a child protector whose chain is this chain plus `purpose`.
    pub fn create_protector(
        &self,
        purpose: impl Into<String>,
    ) -> Result<DataProtector, ProtectionError> {
        let mut purposes = self.purposes.clone();
        purposes.push(purpose.into());
        Self::with_chain(Arc::clone(&self.keyring), purposes)
    }

    /// The protector's purpose chain, in order.
    pub fn purposes(&self) -> &[String] {
        &self.purposes
    }

    /// Protects `plaintext` under the ring's current default key.
    pub fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, ProtectionError> {
        let ring = self.keyring.current()?;
        let key = ring.default_key();
        let encryptor = key.encryptor()?;

        let aad = self.build_aad(key.id());
        let body = encryptor
            .encrypt(plaintext, &aad)
            .map_err(|_| ProtectionError::Cryptographic)?;

        let mut output = Vec::with_capacity(HEADER_SIZE + body.len());
        output.extend_from_slice(&MAGIC_HEADER);
        output.extend_from_slice(key.id().as_bytes());
        output.extend_from_slice(&body);

        debug!(key_id = %key.id(), bytes = plaintext.len(), "payload protected");
        Ok(output)
    }

    /// Recovers the plaintext of a payload protected under the same purpose
    /// chain. Revoked keys are refused.
    pub fn unprotect(&self, payload: &[u8]) -> Result<Vec<u8>, ProtectionError> {
        self.unprotect_raw(payload, AllowRevoked::No)
            .map(|(plaintext, _)| plaintext)
    }

    /// [`Self::unprotect`] with explicit revocation policy, also reporting
    /// which key decrypted the payload and whether it should be re-protected.
    pub fn unprotect_raw(
        &self,
        payload: &[u8],
        allow_revoked: AllowRevoked,
    ) -> Result<(Vec<u8>, UnprotectInfo), ProtectionError> {
        let (key_id, body) = payload::split(payload).ok_or(ProtectionError::Cryptographic)?;

        let ring = self.keyring.current()?;
        let key = ring.key(key_id).ok_or(ProtectionError::Cryptographic)?;

        let was_revoked = key.revoked();
        if was_revoked && allow_revoked == AllowRevoked::No {
            self.audit
                .log(AuditEvent::new(KeyRingOperation::RevokedKeyDenied).with_key(key_id));
            return Err(ProtectionError::Cryptographic);
        }

        let encryptor = key.encryptor()?;
        let aad = self.build_aad(key_id);
        let plaintext = encryptor
            .decrypt(body, &aad)
            .map_err(|_| ProtectionError::Cryptographic)?;

        let info = UnprotectInfo {
            key_id,
            was_revoked,
            requires_migration: was_revoked || key_id != ring.default_key_id(),
        };
        Ok((plaintext, info))
    }

    fn build_aad(&self, key_id: Uuid) -> [u8; AAD_SIZE] {
        let mut aad = [0u8; AAD_SIZE];
        aad[..MAGIC_HEADER.len()].copy_from_slice(&MAGIC_HEADER);
        aad[MAGIC_HEADER.len()..HEADER_SIZE].copy_from_slice(key_id.as_bytes());
        aad[HEADER_SIZE..].copy_from_slice(&self.purpose_digest);
        aad
    }
}

impl std::fmt::Debug for DataProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataProtector")
            .field("purposes", &self.purposes)
            .finish()
    }
}

/// SHA-512 over the length-prefixed purpose strings.
///
/// Length prefixes keep distinct chains distinct: `["ab", "c"]` and
/// `["a", "bc"]` concatenate identically but hash differently.
fn digest_purposes(purposes: &[String]) -> [u8; PURPOSE_DIGEST_SIZE] {
    let mut hasher = Sha512::new();
    for purpose in purposes {
        let bytes = purpose.as_bytes();
        hasher.update((bytes.len() as u32).to_be_bytes());
        hasher.update(bytes);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn digest_distinguishes_split_points() {
        assert_ne!(
            digest_purposes(&strings(&["ab", "c"])),
            digest_purposes(&strings(&["a", "bc"]))
        );
    }

    #[test]
    fn digest_distinguishes_order() {
        assert_ne!(
            digest_purposes(&strings(&["a", "b"])),
            digest_purposes(&strings(&["b", "a"]))
        );
    }

    #[test]
    fn digest_of_empty_chain_is_sha512_of_nothing() {
        let empty: [u8; 64] = Sha512::digest(b"").into();
        assert_eq!(digest_purposes(&[]), empty);
    }

    #[test]
    fn digest_is_deterministic() {
        let chain = strings(&["app", "auth", "cookies"]);
        assert_eq!(digest_purposes(&chain), digest_purposes(&chain));
    }
}
