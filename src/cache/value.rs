//! Wrapped value envelope.

use super::dependency::DependencyMetadata;
use serde::{Deserialize, Serialize};

/// A payload plus the façade's own expiry and dependency metadata.
///
/// Immutable once constructed. `expires_at` is an absolute Unix-second
/// timestamp; `None` means "no façade-enforced expiry, rely on the
/// backend's own TTL".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrappedValue<V> {
    value: V,
    expires_at: Option<i64>,
    dependency: Option<DependencyMetadata>,
}

impl<V> WrappedValue<V> {
    /// Constructs a wrapped value.
    pub const fn new(value: V, expires_at: Option<i64>, dependency: Option<DependencyMetadata>) -> Self {
        Self {
            value,
            expires_at,
            dependency,
        }
    }

    /// Borrows the inner payload.
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the envelope, returning the inner payload.
    pub fn into_value(self) -> V {
        self.value
    }

    /// The absolute expiry timestamp, if the façade enforces one here.
    #[must_use]
    pub const fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    /// Borrows the dependency metadata snapshot, if any.
    #[must_use]
    pub const fn dependency(&self) -> Option<&DependencyMetadata> {
        self.dependency.as_ref()
    }

    /// `expired ≡ expiresAt ≠ null ∧ now() ≥ expiresAt`.
    #[must_use]
    pub fn expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// `remainingTtl ≡ max(0, expiresAt − now())`, or `0` when `expiresAt`
    /// is `None` (meaning "not enforced here", not "already expired").
    #[must_use]
    pub fn remaining_ttl(&self, now: i64) -> i64 {
        self.expires_at.map_or(0, |at| (at - now).max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_expiry_never_expires_and_reports_zero_ttl() {
        let wrapped = WrappedValue::new("v", None, None);
        assert!(!wrapped.expired(1_000_000_000));
        assert_eq!(wrapped.remaining_ttl(1_000_000_000), 0);
    }

    #[test]
    fn expires_at_future_is_not_expired() {
        let wrapped = WrappedValue::new("v", Some(200), None);
        assert!(!wrapped.expired(100));
        assert_eq!(wrapped.remaining_ttl(100), 100);
    }

    #[test]
    fn expires_at_reached_is_expired() {
        let wrapped = WrappedValue::new("v", Some(200), None);
        assert!(wrapped.expired(200));
        assert!(wrapped.expired(201));
        assert_eq!(wrapped.remaining_ttl(200), 0);
    }

    #[test]
    fn round_trips_through_json() {
        let wrapped = WrappedValue::new(42u32, Some(100), None);
        let bytes = serde_json::to_vec(&wrapped).expect("serialize");
        let back: WrappedValue<u32> = serde_json::from_slice(&bytes).expect("deserialize");
        assert_eq!(*back.value(), 42);
        assert_eq!(back.expires_at(), Some(100));
    }
}
