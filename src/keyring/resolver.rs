// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Default-key selection.
//!
//! Pure and deterministic: the same `(now, keys)` always yields the same
//! decision, which tests and concurrent rebuilds both rely on.
//!
//! Selection rules:
//! 1. Only keys that are activated, unexpired, and not revoked qualify.
//! 2. No qualifying key: request a genesis key activating immediately.
//! 3. Otherwise the most recently activated key wins; ties break on the
//!    larger key id (byte order).
//! 4. A default inside the propagation window of its own expiration, with no
//!    successor activating in time, triggers a rollover key that activates
//!    exactly when the current default expires.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::config::KeyRingConfig;
use super::error::KeyRingError;
use super::key::Key;

/// Instruction to create a key with the given lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewKeyRequest {
    pub activation: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
}

/// Outcome of a resolution pass.
#[derive(Debug)]
pub struct Resolution {
    /// The key to protect new payloads under, if any qualifies.
    pub default_key: Option<Arc<Key>>,
    /// A key the manager should create before the ring is published.
    pub generate: Option<NewKeyRequest>,
}

/// Selects the default key for "now" out of a scanned key set.
#[derive(Debug, Clone)]
pub struct DefaultKeyResolver {
    key_lifetime: Duration,
    propagation_window: Duration,
}

impl DefaultKeyResolver {
    /// Builds a resolver from validated configuration.
    pub fn new(config: &KeyRingConfig) -> Result<Self, KeyRingError> {
        let key_lifetime = Duration::from_std(config.key_lifetime)
            .map_err(|_| KeyRingError::Configuration("key lifetime out of range".to_string()))?;
        let propagation_window = Duration::from_std(config.propagation_window).map_err(|_| {
            KeyRingError::Configuration("propagation window out of range".to_string())
        })?;
        Ok(Self {
            key_lifetime,
            propagation_window,
        })
    }

    /// Resolves the default key for `now`.
    pub fn resolve(&self, now: DateTime<Utc>, keys: &[Arc<Key>]) -> Resolution {
        let default = keys
            .iter()
            .filter(|k| k.is_active(now))
            .max_by(|a, b| {
                a.activation()
                    .cmp(&b.activation())
                    .then_with(|| a.id().as_bytes().cmp(b.id().as_bytes()))
            })
            .cloned();

        let Some(default) = default else {
            return Resolution {
                default_key: None,
                generate: Some(NewKeyRequest {
                    activation: now,
                    expiration: now + self.key_lifetime,
                }),
            };
        };

        let mut generate = None;
        if default.expiration() - now < self.propagation_window {
            let horizon = default.expiration() + self.propagation_window;
            let successor_exists = keys.iter().any(|k| {
                !k.revoked()
                    && k.id() != default.id()
                    && k.activation() > default.activation()
                    && k.activation() <= horizon
            });
            if !successor_exists {
                generate = Some(NewKeyRequest {
                    activation: default.expiration(),
                    expiration: default.expiration() + self.key_lifetime,
                });
            }
        }

        Resolution {
            default_key: Some(default),
            generate,
        }
    }
}
