//! Shared test helpers for the integration scenario suites.

use std::sync::Arc;
use tiercache::cache::{Backend, MemoryBackend};
use tiercache::cache::backend::BackendResult;

/// Adapts an `Arc<MemoryBackend>` so the same backend instance can be
/// both owned by the coordinator (as a `Box<dyn Backend>`) and inspected
/// directly by a test via the retained `Arc`.
pub struct SharedBackend(pub Arc<MemoryBackend>);

impl Backend for SharedBackend {
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<i64>) -> BackendResult<bool> {
        self.0.set(key, value, ttl)
    }

    fn add(&self, key: &str, value: Vec<u8>, ttl: Option<i64>) -> BackendResult<bool> {
        self.0.add(key, value, ttl)
    }

    fn delete(&self, key: &str) -> BackendResult<bool> {
        self.0.delete(key)
    }

    fn flush(&self) -> BackendResult<bool> {
        self.0.flush()
    }

    fn class_name(&self) -> &'static str {
        self.0.class_name()
    }
}
