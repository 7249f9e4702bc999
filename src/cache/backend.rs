//! External backend contract.
//!
//! The individual backend drivers (local in-memory map, networked
//! key/value stores, SQL-backed stores) live outside this crate; this
//! trait is the capability set a driver must satisfy. Values are opaque
//! bytes to the backend, so this crate never needs to know how a given
//! driver serializes them.

use thiserror::Error;

/// An error a [`Backend`] raised while servicing a call.
///
/// Caught at the [`crate::cache::layer::GuardedLayer`] boundary and
/// counted as a circuit breaker failure; it never reaches a caller of
/// [`crate::cache::coordinator::TieredCoordinator`] directly.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BackendError(String);

impl BackendError {
    /// Builds a backend error from a display-able cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Minimal capability set a tier's backend must provide.
///
/// Values are opaque `Vec<u8>`. The [`GuardedLayer`](crate::cache::layer::GuardedLayer)
/// above a backend is responsible for wrapping/unwrapping the
/// [`WrappedValue`](crate::cache::value::WrappedValue) envelope.
pub trait Backend: Send + Sync {
    /// Reads the raw bytes stored at `key`, or `Ok(None)` on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on I/O or transport failure.
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Unconditionally stores `value` at `key` with an optional TTL in
    /// seconds (`None` defers to the backend's own default/no expiry).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on I/O or transport failure.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<i64>) -> BackendResult<bool>;

    /// Stores `value` at `key` only if `key` is currently absent.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on I/O or transport failure.
    fn add(&self, key: &str, value: Vec<u8>, ttl: Option<i64>) -> BackendResult<bool>;

    /// Removes `key`. Returns `true` regardless of prior presence:
    /// deleting something that was never there is still a successful
    /// delete.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on I/O or transport failure.
    fn delete(&self, key: &str) -> BackendResult<bool>;

    /// Clears every key this backend holds.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on I/O or transport failure.
    fn flush(&self) -> BackendResult<bool>;

    /// A stable identifier for this backend's concrete type, surfaced via
    /// [`crate::cache::coordinator::LayerStatus`].
    fn class_name(&self) -> &'static str;
}
