// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Key-ring configuration.

use std::time::Duration;

use crate::crypto::{EncryptionAlgorithm, ValidationAlgorithm};

use super::error::KeyRingError;

/// Tunables for key creation, rotation, and ring refresh.
#[derive(Debug, Clone)]
pub struct KeyRingConfig {
    /// Delay between creating a key and it becoming the default, giving the
    /// new key time to propagate to every consumer of the repository.
    pub activation_delay: Duration,
    /// How long a key stays usable for protecting new payloads.
    pub key_lifetime: Duration,
    /// Window before expiration in which a successor key is produced.
    pub propagation_window: Duration,
    /// How long a cached key-ring snapshot may be served before a refresh.
    pub refresh_interval: Duration,
    /// Encryption algorithm for newly created keys.
    pub encryption_algorithm: EncryptionAlgorithm,
    /// Validation algorithm for newly created CBC keys.
    pub validation_algorithm: ValidationAlgorithm,
}

impl Default for KeyRingConfig {
    fn default() -> Self {
        Self {
            activation_delay: Duration::from_secs(2 * 24 * 60 * 60),
            key_lifetime: Duration::from_secs(90 * 24 * 60 * 60),
            propagation_window: Duration::from_secs(2 * 24 * 60 * 60),
            refresh_interval: Duration::from_secs(24 * 60 * 60),
            encryption_algorithm: EncryptionAlgorithm::Aes256Cbc,
            validation_algorithm: ValidationAlgorithm::HmacSha512,
        }
    }
}

impl KeyRingConfig {
    /// Sets the activation delay for new keys.
    pub fn with_activation_delay(mut self, delay: Duration) -> Self {
        self.activation_delay = delay;
        self
    }

    /// Sets the lifetime of new keys.
    pub fn with_key_lifetime(mut self, lifetime: Duration) -> Self {
        self.key_lifetime = lifetime;
        self
    }

    /// Sets the pre-expiration window in which successor keys are produced.
    pub fn with_propagation_window(mut self, window: Duration) -> Self {
        self.propagation_window = window;
        self
    }

    /// Sets the snapshot refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Sets the algorithms used for newly created keys.
    pub fn with_algorithms(
        mut self,
        encryption: EncryptionAlgorithm,
        validation: ValidationAlgorithm,
    ) -> Self {
        self.encryption_algorithm = encryption;
        self.validation_algorithm = validation;
        self
    }

    /// Rejects configurations that cannot produce a working ring.
    pub fn validate(&self) -> Result<(), KeyRingError> {
        if self.key_lifetime.is_zero() {
            return Err(KeyRingError::Configuration(
                "key lifetime must be non-zero".to_string(),
            ));
        }
        if self.key_lifetime <= self.activation_delay {
            return Err(KeyRingError::Configuration(
                "key lifetime must exceed the activation delay".to_string(),
            ));
        }
        if self.propagation_window >= self.key_lifetime {
            return Err(KeyRingError::Configuration(
                "propagation window must be shorter than the key lifetime".to_string(),
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(KeyRingError::Configuration(
                "refresh interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
