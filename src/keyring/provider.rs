// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Caching key-ring provider.
//!
//! Serves an immutable snapshot of the ring and rebuilds it when the
//! snapshot crosses its refresh deadline or [`KeyRingProvider::invalidate`]
//! is called. Rebuilds are single-flight: one thread scans the repository
//! while concurrent callers wait on a condition variable for the same result.
//! If a rebuild fails and a previous snapshot exists, callers keep receiving
//! the stale snapshot and the next call retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::clock::Clock;

use super::audit::{AuditEvent, AuditLogger, KeyRingOperation};
use super::config::KeyRingConfig;
use super::error::KeyRingError;
use super::manager::XmlKeyManager;
use super::resolver::DefaultKeyResolver;
use super::snapshot::KeyRing;

/// How long a caller waits on another thread's in-flight rebuild before
/// falling back to the stale snapshot (or failing when none exists).
const REBUILD_WAIT: Duration = Duration::from_secs(30);

/// Backoff applied when the computed refresh deadline is not in the future,
/// so a ring at its expiration edge does not rebuild on every call.
const REFRESH_FLOOR_SECS: i64 = 120;

struct ProviderState {
    snapshot: Option<Arc<KeyRing>>,
    invalidated: bool,
    rebuilding: bool,
}

/// Caches the current [`KeyRing`] and coordinates its refresh.
pub struct KeyRingProvider {
    manager: Arc<XmlKeyManager>,
    resolver: DefaultKeyResolver,
    refresh_interval: chrono::Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<ProviderState>,
    rebuild_done: Condvar,
    audit: AuditLogger,
}

impl KeyRingProvider {
    /// Creates a provider over a key manager. Fails on invalid configuration.
    pub fn new(
        manager: Arc<XmlKeyManager>,
        config: &KeyRingConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, KeyRingError> {
        config.validate()?;
        let refresh_interval = chrono::Duration::from_std(config.refresh_interval)
            .map_err(|_| KeyRingError::Configuration("refresh interval out of range".to_string()))?;
        Ok(Self {
            manager,
            resolver: DefaultKeyResolver::new(config)?,
            refresh_interval,
            clock,
            state: Mutex::new(ProviderState {
                snapshot: None,
                invalidated: false,
                rebuilding: false,
            }),
            rebuild_done: Condvar::new(),
            audit: AuditLogger::new("key-ring-provider"),
        })
    }

    /// Returns a non-expired snapshot, rebuilding if necessary.
    pub fn current(&self) -> Result<Arc<KeyRing>, KeyRingError> {
        let mut state = self.state.lock();
        loop {
            if let Some(snapshot) = &state.snapshot {
                if !state.invalidated && self.clock.now() < snapshot.refresh_deadline() {
                    return Ok(Arc::clone(snapshot));
                }
            }

            if state.rebuilding {
                let timed_out = self
                    .rebuild_done
                    .wait_for(&mut state, REBUILD_WAIT)
                    .timed_out();
                if timed_out {
                    return match &state.snapshot {
                        Some(snapshot) => {
                            warn!("key ring rebuild still in flight, serving previous snapshot");
                            Ok(Arc::clone(snapshot))
                        }
                        None => Err(KeyRingError::RebuildTimeout),
                    };
                }
                continue;
            }

            state.rebuilding = true;
            let result = MutexGuard::unlocked(&mut state, || self.rebuild());
            state.rebuilding = false;
            self.rebuild_done.notify_all();

            match result {
                Ok(ring) => {
                    state.snapshot = Some(Arc::clone(&ring));
                    state.invalidated = false;
                    return Ok(ring);
                }
                Err(error) => {
                    self.audit.log(
                        AuditEvent::new(KeyRingOperation::RingRefreshFailed)
                            .with_details(error.to_string()),
                    );
                    if let Some(snapshot) = &state.snapshot {
                        warn!(%error, "key ring rebuild failed, serving previous snapshot");
                        return Ok(Arc::clone(snapshot));
                    }
                    return Err(error);
                }
            }
        }
    }

    /// Marks the cached snapshot expired; the next [`Self::current`] call
    /// rebuilds. Calls already in flight may still complete under the old
    /// snapshot.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.invalidated = true;
        debug!("key ring snapshot invalidated");
    }

    fn rebuild(&self) -> Result<Arc<KeyRing>, KeyRingError> {
        let now = self.clock.now();
        let mut keys = self.manager.get_all_keys()?;
        let mut resolution = self.resolver.resolve(now, &keys);

        if let Some(request) = resolution.generate.take() {
            match self
                .manager
                .create_new_key(request.activation, request.expiration)
            {
                Ok(key) => {
                    keys.push(key);
                    resolution = self.resolver.resolve(now, &keys);
                }
                Err(error) => {
                    // A failed rollover is survivable while the current
                    // default still works; a failed genesis is not.
                    if resolution.default_key.is_none() {
                        return Err(error);
                    }
                    warn!(%error, "rollover key creation failed, keeping current default");
                }
            }
        }

        let default_key = resolution.default_key.ok_or(KeyRingError::NoDefaultKey)?;
        let refresh_deadline = self.refresh_deadline(now, default_key.expiration());

        self.audit.log(
            AuditEvent::new(KeyRingOperation::RingRefreshed)
                .with_key(default_key.id())
                .with_details(format!("keys={}", keys.len())),
        );
        Ok(Arc::new(KeyRing::new(
            keys,
            default_key,
            now,
            refresh_deadline,
        )))
    }

    fn refresh_deadline(
        &self,
        now: DateTime<Utc>,
        default_expiration: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let deadline = (now + self.refresh_interval).min(default_expiration);
        if deadline <= now {
            // Only reachable with a default already at its expiration edge;
            // back off instead of rebuilding on every call.
            now + chrono::Duration::seconds(REFRESH_FLOOR_SECS)
        } else {
            deadline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::error::RepositoryError;
    use crate::keyring::repository::{InMemoryRepository, KeyRepository};
    use chrono::TimeZone;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration as StdDuration;
    use xmltree::Element;

    struct ManualClock {
        now: PlMutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn at(secs: i64) -> Arc<Self> {
            Arc::new(Self {
                now: PlMutex::new(Utc.timestamp_opt(secs, 0).unwrap()),
            })
        }

        fn advance(&self, by: chrono::Duration) {
            *self.now.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }

    /// Counts scans and optionally fails reads after the first success.
    struct CountingRepository {
        inner: InMemoryRepository,
        scans: AtomicUsize,
        fail_reads: AtomicBool,
    }

    impl CountingRepository {
        fn new() -> Self {
            Self {
                inner: InMemoryRepository::new(),
                scans: AtomicUsize::new(0),
                fail_reads: AtomicBool::new(false),
            }
        }
    }

    impl KeyRepository for CountingRepository {
        fn get_all_elements(&self) -> Result<Vec<Element>, RepositoryError> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(RepositoryError::Unavailable("injected outage".to_string()));
            }
            self.inner.get_all_elements()
        }

        fn store_element(
            &self,
            element: Element,
            friendly_name: &str,
        ) -> Result<(), RepositoryError> {
            self.inner.store_element(element, friendly_name)
        }
    }

    fn provider_over(
        repository: Arc<CountingRepository>,
        clock: Arc<ManualClock>,
    ) -> KeyRingProvider {
        let config = KeyRingConfig::default();
        let manager = Arc::new(
            XmlKeyManager::new(repository as Arc<dyn KeyRepository>, config.clone())
                .unwrap()
                .with_clock(Arc::clone(&clock) as Arc<dyn Clock>),
        );
        KeyRingProvider::new(manager, &config, clock).unwrap()
    }

    #[test]
    fn first_call_provisions_a_genesis_key() {
        let repository = Arc::new(CountingRepository::new());
        let clock = ManualClock::at(1_000_000);
        let provider = provider_over(Arc::clone(&repository), clock);

        let ring = provider.current().unwrap();
        assert_eq!(ring.len(), 1);
        assert!(ring.default_key().is_active(Utc.timestamp_opt(1_000_000, 0).unwrap()));
    }

    #[test]
    fn fresh_snapshot_is_served_without_rescanning() {
        let repository = Arc::new(CountingRepository::new());
        let clock = ManualClock::at(1_000_000);
        let provider = provider_over(Arc::clone(&repository), clock);

        let first = provider.current().unwrap();
        let scans_after_first = repository.scans.load(Ordering::SeqCst);
        let second = provider.current().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(repository.scans.load(Ordering::SeqCst), scans_after_first);
    }

    #[test]
    fn crossing_the_deadline_triggers_a_rebuild() {
        let repository = Arc::new(CountingRepository::new());
        let clock = ManualClock::at(1_000_000);
        let provider = provider_over(Arc::clone(&repository), Arc::clone(&clock));

        let first = provider.current().unwrap();
        clock.advance(chrono::Duration::hours(25));
        let second = provider.current().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidate_forces_a_rebuild() {
        let repository = Arc::new(CountingRepository::new());
        let clock = ManualClock::at(1_000_000);
        let provider = provider_over(Arc::clone(&repository), clock);

        let first = provider.current().unwrap();
        provider.invalidate();
        let second = provider.current().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        // Same persisted key set, fresh snapshot.
        assert_eq!(second.default_key_id(), first.default_key_id());
    }

    #[test]
    fn repository_outage_serves_the_stale_snapshot() {
        let repository = Arc::new(CountingRepository::new());
        let clock = ManualClock::at(1_000_000);
        let provider = provider_over(Arc::clone(&repository), Arc::clone(&clock));

        let first = provider.current().unwrap();
        repository.fail_reads.store(true, Ordering::SeqCst);
        clock.advance(chrono::Duration::hours(25));

        let stale = provider.current().unwrap();
        assert!(Arc::ptr_eq(&first, &stale));

        // Recovery on a later call once the repository is back.
        repository.fail_reads.store(false, Ordering::SeqCst);
        let fresh = provider.current().unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
    }

    #[test]
    fn outage_with_no_snapshot_surfaces_the_error() {
        let repository = Arc::new(CountingRepository::new());
        repository.fail_reads.store(true, Ordering::SeqCst);
        let clock = ManualClock::at(1_000_000);
        let provider = provider_over(repository, clock);

        assert!(matches!(
            provider.current(),
            Err(KeyRingError::Repository(_))
        ));
    }

    #[test]
    fn concurrent_expired_callers_share_one_scan() {
        let repository = Arc::new(CountingRepository::new());
        let clock = ManualClock::at(1_000_000);
        let provider = Arc::new(provider_over(Arc::clone(&repository), Arc::clone(&clock)));

        provider.current().unwrap();
        clock.advance(chrono::Duration::hours(25));
        let scans_before = repository.scans.load(Ordering::SeqCst);

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let provider = Arc::clone(&provider);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    provider.current().unwrap().created_at()
                })
            })
            .collect();

        let stamps: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(stamps.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(repository.scans.load(Ordering::SeqCst), scans_before + 1);
    }

    #[test]
    fn deadline_is_capped_by_default_key_expiration() {
        let repository = Arc::new(CountingRepository::new());
        let clock = ManualClock::at(1_000_000);
        let config = KeyRingConfig::default()
            .with_key_lifetime(StdDuration::from_secs(3600))
            .with_activation_delay(StdDuration::from_secs(60))
            .with_propagation_window(StdDuration::from_secs(600));
        let manager = Arc::new(
            XmlKeyManager::new(
                Arc::clone(&repository) as Arc<dyn KeyRepository>,
                config.clone(),
            )
            .unwrap()
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>),
        );
        let provider = KeyRingProvider::new(manager, &config, clock).unwrap();

        let ring = provider.current().unwrap();
        assert!(ring.refresh_deadline() <= ring.default_key().expiration());
    }
}
