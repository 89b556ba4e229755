// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Immutable key-ring snapshots.
//!
//! Each refresh publishes a fully built ring behind an `Arc`; readers keep
//! whatever snapshot they were handed and never observe a partially populated
//! ring. The only post-construction mutation anywhere in a ring is the
//! monotonic `revoked` flag on individual keys.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::key::Key;

/// Snapshot of all known keys plus the designated default.
pub struct KeyRing {
    keys: HashMap<Uuid, Arc<Key>>,
    default_key: Arc<Key>,
    created_at: DateTime<Utc>,
    refresh_deadline: DateTime<Utc>,
}

impl KeyRing {
    /// Assembles a snapshot. The default key must come from `keys`; the
    /// resolver guarantees it is activated, unexpired, and unrevoked at
    /// snapshot time.
    pub(crate) fn new(
        keys: Vec<Arc<Key>>,
        default_key: Arc<Key>,
        created_at: DateTime<Utc>,
        refresh_deadline: DateTime<Utc>,
    ) -> Self {
        let keys = keys.into_iter().map(|k| (k.id(), k)).collect();
        Self {
            keys,
            default_key,
            created_at,
            refresh_deadline,
        }
    }

    /// The key new payloads are protected under.
    pub fn default_key(&self) -> &Arc<Key> {
        &self.default_key
    }

    pub fn default_key_id(&self) -> Uuid {
        self.default_key.id()
    }

    /// Looks up a key by id.
    pub fn key(&self, id: Uuid) -> Option<&Arc<Key>> {
        self.keys.get(&id)
    }

    /// Number of keys in the snapshot.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// When this snapshot was built.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Wall-clock instant after which the snapshot counts as expired.
    pub fn refresh_deadline(&self) -> DateTime<Utc> {
        self.refresh_deadline
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("keys", &self.keys.len())
            .field("default_key_id", &self.default_key_id())
            .field("created_at", &self.created_at)
            .field("refresh_deadline", &self.refresh_deadline)
            .finish()
    }
}
