//! In-process demo/test backend (NOT a production driver).
//!
//! Backend drivers for real stores are out of scope for this crate; this
//! one exists purely so the demo binary and the integration tests in
//! `tests/` have a concrete [`Backend`] to drive the coordinator against,
//! plus a fault-injection switch for exercising the circuit breaker
//! deterministically under a failover scenario.

use super::backend::{Backend, BackendError, BackendResult};
use crate::clock::Clock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct Entry {
    bytes: Vec<u8>,
    expires_at: Option<i64>,
}

/// An in-memory `HashMap`-backed [`Backend`] with its own TTL bookkeeping
/// (standing in for whatever expiry the real external backend enforces),
/// a `set_failing` switch that makes every call return an error, and a
/// `get` call counter tests use to prove a breaker-skipped tier was
/// never actually touched.
pub struct MemoryBackend {
    name: &'static str,
    clock: Arc<dyn Clock>,
    store: Mutex<HashMap<String, Entry>>,
    failing: AtomicBool,
    get_calls: AtomicUsize,
}

impl MemoryBackend {
    /// Creates an empty, healthy backend named `name`.
    #[must_use]
    pub fn new(name: &'static str, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            clock,
            store: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            get_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `get` calls this backend has serviced (including ones
    /// that errored).
    #[must_use]
    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Test hook: makes every subsequent call raise a [`BackendError`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.store
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn fail_if_configured(&self, operation: &'static str) -> BackendResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(BackendError::new(format!(
                "simulated failure in backend '{}' during {operation}",
                self.name
            )))
        } else {
            Ok(())
        }
    }

    /// Test/scenario hook: reads the raw stored bytes directly, bypassing
    /// the circuit breaker and expiry checks a real [`Backend::get`] call
    /// would apply. Used by integration tests to inspect what a tier
    /// actually persisted.
    #[must_use]
    pub fn inspect_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).map(|entry| entry.bytes.clone())
    }

    /// Test/scenario hook: removes `key` directly, bypassing the
    /// coordinator and breaker entirely (simulates a deeper tier having
    /// evicted or expired an entry out from under the façade).
    pub fn remove_direct(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Test/scenario hook: writes raw bytes directly, bypassing the
    /// façade's wrapping. Used to simulate an external writer sharing
    /// this backend in compatibility mode.
    pub fn write_raw(&self, key: &str, bytes: Vec<u8>) {
        self.lock().insert(
            key.to_string(),
            Entry {
                bytes,
                expires_at: None,
            },
        );
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_if_configured("get")?;
        let mut store = self.lock();
        let now = self.clock.now();
        if let Some(entry) = store.get(key) {
            if entry.expires_at.is_some_and(|at| now >= at) {
                store.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.bytes.clone()));
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<i64>) -> BackendResult<bool> {
        self.fail_if_configured("set")?;
        let expires_at = ttl.filter(|t| *t > 0).map(|t| self.clock.now() + t);
        self.lock().insert(
            key.to_string(),
            Entry {
                bytes: value,
                expires_at,
            },
        );
        Ok(true)
    }

    fn add(&self, key: &str, value: Vec<u8>, ttl: Option<i64>) -> BackendResult<bool> {
        self.fail_if_configured("add")?;
        let mut store = self.lock();
        let now = self.clock.now();
        let occupied = store
            .get(key)
            .is_some_and(|entry| !entry.expires_at.is_some_and(|at| now >= at));
        if occupied {
            return Ok(false);
        }
        let expires_at = ttl.filter(|t| *t > 0).map(|t| now + t);
        store.insert(
            key.to_string(),
            Entry {
                bytes: value,
                expires_at,
            },
        );
        Ok(true)
    }

    fn delete(&self, key: &str) -> BackendResult<bool> {
        self.fail_if_configured("delete")?;
        self.lock().remove(key);
        Ok(true)
    }

    fn flush(&self) -> BackendResult<bool> {
        self.fail_if_configured("flush")?;
        self.lock().clear();
        Ok(true)
    }

    fn class_name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;

    fn backend() -> MemoryBackend {
        MemoryBackend::new("memory", Arc::new(TestClock::new(0)))
    }

    #[test]
    fn set_then_get_round_trips() {
        let b = backend();
        b.set("k", b"v".to_vec(), None).expect("set");
        assert_eq!(b.get("k").expect("get"), Some(b"v".to_vec()));
    }

    #[test]
    fn add_rejects_existing_key() {
        let b = backend();
        assert!(b.add("k", b"v1".to_vec(), None).expect("add"));
        assert!(!b.add("k", b"v2".to_vec(), None).expect("add"));
        assert_eq!(b.get("k").expect("get"), Some(b"v1".to_vec()));
    }

    #[test]
    fn ttl_expiry_is_enforced_on_read() {
        let clock = Arc::new(TestClock::new(0));
        let b = MemoryBackend::new("memory", clock.clone());
        b.set("k", b"v".to_vec(), Some(5)).expect("set");
        clock.advance(5);
        assert_eq!(b.get("k").expect("get"), None);
    }

    #[test]
    fn failing_mode_errors_on_every_call() {
        let b = backend();
        b.set_failing(true);
        assert!(b.get("k").is_err());
        assert!(b.set("k", vec![], None).is_err());
        assert!(b.delete("k").is_err());
    }

    #[test]
    fn delete_reports_success_regardless_of_prior_presence() {
        let b = backend();
        assert!(b.delete("absent").expect("delete"));
    }
}
