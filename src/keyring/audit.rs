// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Audit logging for key-lifecycle operations.
//!
//! Emits structured events for everything that changes or gates access to key
//! material: creation, revocation, ring refreshes, and denied decrypts.
//! Events carry key ids and counts, never key material.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, info, warn};
use uuid::Uuid;

/// Key-lifecycle operations that are audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRingOperation {
    /// A new key was created and persisted.
    KeyCreated,
    /// A single key was revoked.
    KeyRevoked,
    /// All keys up to a cut-off date were revoked.
    MassRevocation,
    /// A fresh key-ring snapshot was published.
    RingRefreshed,
    /// A snapshot rebuild failed.
    RingRefreshFailed,
    /// A decrypt under a revoked key was refused.
    RevokedKeyDenied,
}

impl KeyRingOperation {
    /// Returns the operation name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRingOperation::KeyCreated => "key_created",
            KeyRingOperation::KeyRevoked => "key_revoked",
            KeyRingOperation::MassRevocation => "mass_revocation",
            KeyRingOperation::RingRefreshed => "ring_refreshed",
            KeyRingOperation::RingRefreshFailed => "ring_refresh_failed",
            KeyRingOperation::RevokedKeyDenied => "revoked_key_denied",
        }
    }

    /// Returns the severity level for this operation.
    pub fn severity(&self) -> AuditSeverity {
        match self {
            KeyRingOperation::KeyCreated => AuditSeverity::Info,
            KeyRingOperation::KeyRevoked => AuditSeverity::Warning,
            KeyRingOperation::MassRevocation => AuditSeverity::Warning,
            KeyRingOperation::RingRefreshed => AuditSeverity::Info,
            KeyRingOperation::RingRefreshFailed => AuditSeverity::Error,
            KeyRingOperation::RevokedKeyDenied => AuditSeverity::Critical,
        }
    }
}

/// Severity levels for audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuditSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// An audit event for a key-lifecycle operation.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: u64,
    /// The operation that occurred.
    pub operation: KeyRingOperation,
    /// The key involved, if the operation targets one key.
    pub key_id: Option<Uuid>,
    /// Optional additional details.
    pub details: Option<String>,
}

impl AuditEvent {
    /// Creates a new audit event.
    pub fn new(operation: KeyRingOperation) -> Self {
        static EVENT_COUNTER: AtomicU64 = AtomicU64::new(0);

        Self {
            event_id: EVENT_COUNTER.fetch_add(1, Ordering::SeqCst),
            operation,
            key_id: None,
            details: None,
        }
    }

    /// Attaches the key this event concerns.
    pub fn with_key(mut self, key_id: Uuid) -> Self {
        self.key_id = Some(key_id);
        self
    }

    /// Adds details to the event.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Emits audit events through `tracing`.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    component: &'static str,
}

impl AuditLogger {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    /// Logs an event at its operation's severity.
    pub fn log(&self, event: AuditEvent) {
        let key_id = event.key_id.map(|id| id.to_string()).unwrap_or_default();
        let details = event.details.as_deref().unwrap_or("");
        match event.operation.severity() {
            AuditSeverity::Info => info!(
                component = self.component,
                event_id = event.event_id,
                operation = event.operation.as_str(),
                %key_id,
                details,
                "key ring audit event"
            ),
            AuditSeverity::Warning => warn!(
                component = self.component,
                event_id = event.event_id,
                operation = event.operation.as_str(),
                %key_id,
                details,
                "key ring audit event"
            ),
            AuditSeverity::Error | AuditSeverity::Critical => error!(
                component = self.component,
                event_id = event.event_id,
                operation = event.operation.as_str(),
                %key_id,
                details,
                "key ring audit event"
            ),
        }
    }
}
