// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! A key: lifecycle metadata plus a lazily materialized encryptor.
//!
//! Keys read back from the repository keep their descriptor as raw XML until
//! the first encryptor use, so startup never decrypts every at-rest secret.
//! Materialization is memoized per key; the `revoked` flag is the only
//! mutable state and only ever transitions false to true.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use uuid::Uuid;
use xmltree::Element;

use crate::crypto::AuthenticatedEncryptor;
use crate::descriptors::{Descriptor, DeserializerRegistry};
use crate::xml::{open_secrets, XmlDecryptorActivator};

use super::error::KeyRingError;

/// Descriptor still in XML form, plus what is needed to materialize it.
struct DeferredDescriptor {
    element: Element,
    activator: Arc<XmlDecryptorActivator>,
    deserializers: Arc<DeserializerRegistry>,
}

/// One member of the key ring.
pub struct Key {
    id: Uuid,
    creation: DateTime<Utc>,
    activation: DateTime<Utc>,
    expiration: DateTime<Utc>,
    revoked: AtomicBool,
    deferred: Option<DeferredDescriptor>,
    descriptor: OnceCell<Descriptor>,
    encryptor: OnceCell<Arc<dyn AuthenticatedEncryptor>>,
}

impl Key {
    /// Builds a key around an already-parsed descriptor (the create path).
    ///
    /// Enforces the lifecycle invariants: activation at or after creation,
    /// expiration strictly after activation.
    pub(crate) fn new(
        id: Uuid,
        creation: DateTime<Utc>,
        activation: DateTime<Utc>,
        expiration: DateTime<Utc>,
        descriptor: Descriptor,
    ) -> Result<Self, KeyRingError> {
        if activation < creation {
            return Err(KeyRingError::Configuration(format!(
                "key {id}: activation precedes creation"
            )));
        }
        if expiration <= activation {
            return Err(KeyRingError::Configuration(format!(
                "key {id}: expiration does not follow activation"
            )));
        }
        let cell = OnceCell::new();
        let _ = cell.set(descriptor);
        Ok(Self {
            id,
            creation,
            activation,
            expiration,
            revoked: AtomicBool::new(false),
            deferred: None,
            descriptor: cell,
            encryptor: OnceCell::new(),
        })
    }

    /// Builds a key whose descriptor stays in XML form until first use (the
    /// read path). Persisted documents are taken as-is.
    pub(crate) fn deferred(
        id: Uuid,
        creation: DateTime<Utc>,
        activation: DateTime<Utc>,
        expiration: DateTime<Utc>,
        element: Element,
        activator: Arc<XmlDecryptorActivator>,
        deserializers: Arc<DeserializerRegistry>,
    ) -> Self {
        Self {
            id,
            creation,
            activation,
            expiration,
            revoked: AtomicBool::new(false),
            deferred: Some(DeferredDescriptor {
                element,
                activator,
                deserializers,
            }),
            descriptor: OnceCell::new(),
            encryptor: OnceCell::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn creation(&self) -> DateTime<Utc> {
        self.creation
    }

    pub fn activation(&self) -> DateTime<Utc> {
        self.activation
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// Whether this key has been revoked. Monotonic: once true, stays true.
    pub fn revoked(&self) -> bool {
        self.revoked.load(Ordering::Relaxed)
    }

    /// Marks the key revoked.
    pub fn set_revoked(&self) {
        self.revoked.store(true, Ordering::Relaxed);
    }

    /// Activated, unexpired, and not revoked at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.activation <= now && now < self.expiration && !self.revoked()
    }

    /// The key's descriptor, materializing it from XML on first use.
    pub fn descriptor(&self) -> Result<&Descriptor, KeyRingError> {
        self.descriptor.get_or_try_init(|| {
            let Some(deferred) = &self.deferred else {
                // new() always seeds the cell, deferred() always sets source
                unreachable!("key without descriptor source");
            };
            let mut element = deferred.element.clone();
            open_secrets(&mut element, &deferred.activator)?;
            Ok(deferred.deserializers.deserialize(&element)?)
        })
    }

    /// The key's encryptor, built (and memoized) on first use.
    pub fn encryptor(&self) -> Result<Arc<dyn AuthenticatedEncryptor>, KeyRingError> {
        let encryptor = self
            .encryptor
            .get_or_try_init(|| Ok::<_, KeyRingError>(self.descriptor()?.build_encryptor()?))?;
        Ok(Arc::clone(encryptor))
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.id)
            .field("creation", &self.creation)
            .field("activation", &self.activation)
            .field("expiration", &self.expiration)
            .field("revoked", &self.revoked())
            .finish()
    }
}
