// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Cloak: application-level data protection with transparent key rotation
//!
//! This crate lets application code protect an opaque byte string into an
//! authenticated, encrypted payload and recover it later, while the underlying
//! encryption keys rotate automatically over time. Protection is
//! purpose-scoped: callers with different purpose chains cannot read each
//! other's payloads even though they share one key ring.

pub mod clock;
pub mod crypto;
pub mod descriptors;
pub mod keyring;
pub mod protect;
pub mod xml;

pub use clock::{Clock, SystemClock};
pub use crypto::{
    AuthenticatedEncryptor, CryptoError, EncryptionAlgorithm, Secret, ValidationAlgorithm,
};
pub use descriptors::{CbcHmacDescriptor, Descriptor, DeserializerRegistry, GcmDescriptor};
pub use keyring::{
    DefaultKeyResolver, InMemoryRepository, Key, KeyRepository, KeyRing, KeyRingConfig,
    KeyRingError, KeyRingProvider, RepositoryError, XmlKeyManager,
};
pub use protect::{
    AllowRevoked, DataProtectionProvider, DataProtector, ProtectionError, UnprotectInfo,
};
pub use xml::{
    NullXmlDecryptor, NullXmlEncryptor, XmlDecryptor, XmlDecryptorActivator, XmlEncryptor,
    XmlError,
};
