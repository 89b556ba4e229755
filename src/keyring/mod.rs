// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Key management: persisted keys, revocation, default-key selection, and
//! the cached key-ring snapshot.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Key Management                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌───────────────┐   ┌───────────────┐  │
//! │  │ KeyRepository│──▶│ XmlKeyManager │──▶│DefaultKey-    │  │
//! │  │ (elements)   │   │ (keys + revo- │   │Resolver       │  │
//! │  └──────────────┘   │  cations)     │   └───────┬───────┘  │
//! │                     └───────────────┘           │          │
//! │                                         ┌───────┴───────┐  │
//! │                                         │KeyRingProvider│  │
//! │                                         │  (snapshot)   │  │
//! │                                         └───────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The manager turns repository elements into [`Key`]s and back; the resolver
//! picks the default key for "now"; the provider caches the assembled
//! [`KeyRing`] and rebuilds it single-flight when it expires.

pub mod audit;
mod config;
mod error;
mod key;
mod manager;
mod provider;
mod repository;
mod resolver;
mod snapshot;

pub use audit::{AuditEvent, AuditLogger, AuditSeverity, KeyRingOperation};
pub use config::KeyRingConfig;
pub use error::{KeyRingError, RepositoryError};
pub use key::Key;
pub use manager::XmlKeyManager;
pub use provider::KeyRingProvider;
pub use repository::{InMemoryRepository, KeyRepository};
pub use resolver::{DefaultKeyResolver, NewKeyRequest, Resolution};
pub use snapshot::KeyRing;
