//! Guarded layer: one backend paired with one breaker.
//!
//! Each call follows the same shape: check whether the breaker allows
//! the request, invoke the backend, record the outcome. The
//! wrapping/unwrapping of [`WrappedValue`] happens at this layer rather
//! than being left to the backend.

use super::backend::{Backend, BackendError};
use super::breaker::{BreakerStats, CircuitBreaker, CircuitState};
use super::dependency::DependencyMetadata;
use super::value::WrappedValue;
use crate::clock::Clock;
use crate::config::LayerConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of a guarded-layer call that did not produce a value.
///
/// Distinguishes "breaker rejected the call" (expected, not logged as a
/// failure) from genuine backend/format errors so the coordinator can
/// apply the right logging level and cascade behavior for each.
#[derive(Debug, Error)]
pub enum LayerError {
    /// The breaker is `OPEN`; the backend was not touched.
    #[error("layer unavailable: circuit breaker open")]
    Unavailable,
    /// The backend raised an error servicing the call.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    /// The stored payload was not a `WrappedValue` and strict mode is on.
    #[error("format error: {0}")]
    Format(String),
}

/// Pairs a [`Backend`] with a [`CircuitBreaker`] and the TTL ceiling for
/// this tier, wrapping/unwrapping [`WrappedValue`] envelopes at the
/// boundary.
pub struct GuardedLayer<V> {
    backend: Box<dyn Backend>,
    breaker: CircuitBreaker,
    clock: Arc<dyn Clock>,
    layer_ttl: Option<i64>,
    _value: std::marker::PhantomData<fn() -> V>,
}

impl<V> GuardedLayer<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Builds a guarded layer from a backend and its tier configuration.
    pub fn new(backend: Box<dyn Backend>, config: &LayerConfig, clock: Arc<dyn Clock>) -> Self {
        let breaker = CircuitBreaker::new(config.breaker, clock.clone());
        Self {
            backend,
            breaker,
            clock,
            layer_ttl: config.ttl,
            _value: std::marker::PhantomData,
        }
    }

    /// The TTL ceiling configured for this tier.
    #[must_use]
    pub const fn layer_ttl(&self) -> Option<i64> {
        self.layer_ttl
    }

    /// The backend's class identifier, for [`super::coordinator::LayerStatus`].
    #[must_use]
    pub fn backend_class(&self) -> &'static str {
        self.backend.class_name()
    }

    /// The breaker's current state.
    #[must_use]
    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// The breaker's current sliding-window statistics.
    #[must_use]
    pub fn breaker_stats(&self) -> BreakerStats {
        self.breaker.stats()
    }

    /// Admin: forces this tier's breaker open.
    pub fn force_open(&self) {
        self.breaker.force_open();
    }

    /// Admin: forces this tier's breaker closed.
    pub fn force_close(&self) {
        self.breaker.force_close();
    }

    /// Admin: resets this tier's breaker to an empty closed state.
    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }

    /// Reads and unwraps the value stored at `key`.
    ///
    /// `Ok(None)` is a genuine miss. In non-strict mode, a payload that
    /// doesn't parse as a [`WrappedValue`] is auto-wrapped with no expiry
    /// and no dependency: the compatibility-mode rule for reading values
    /// a legacy writer stored without this façade's envelope.
    ///
    /// # Errors
    ///
    /// [`LayerError::Unavailable`] if the breaker is open;
    /// [`LayerError::Backend`] on a backend failure;
    /// [`LayerError::Format`] on a non-wrapped payload under strict mode,
    /// or on a payload that parses as neither a wrapped value nor a raw
    /// legacy value.
    pub fn get_value(
        &self,
        key: &str,
        strict_mode: bool,
    ) -> Result<Option<WrappedValue<V>>, LayerError> {
        if !self.breaker.allows_request() {
            metrics::counter!("tiercache_requests_total", "backend" => self.backend_class(), "operation" => "get", "status" => "rejected").increment(1);
            return Err(LayerError::Unavailable);
        }

        let outcome = match self.backend.get(key) {
            Err(e) => {
                self.breaker.record_failure();
                Err(LayerError::Backend(e))
            },
            Ok(None) => {
                self.breaker.record_success();
                Ok(None)
            },
            Ok(Some(bytes)) => match serde_json::from_slice::<WrappedValue<V>>(&bytes) {
                Ok(wrapped) => {
                    self.breaker.record_success();
                    Ok(Some(wrapped))
                },
                Err(wrapped_err) => {
                    if strict_mode {
                        self.breaker.record_failure();
                        Err(LayerError::Format(format!(
                            "payload is not a wrapped value: {wrapped_err}"
                        )))
                    } else {
                        match serde_json::from_slice::<V>(&bytes) {
                            Ok(value) => {
                                self.breaker.record_success();
                                Ok(Some(WrappedValue::new(value, None, None)))
                            },
                            Err(raw_err) => {
                                self.breaker.record_failure();
                                Err(LayerError::Format(format!(
                                    "payload is neither a wrapped value ({wrapped_err}) nor a raw value ({raw_err})"
                                )))
                            },
                        }
                    }
                },
            },
        };
        self.record_call_metrics("get", &outcome);
        outcome
    }

    fn record_call_metrics<T>(&self, operation: &'static str, outcome: &Result<T, LayerError>) {
        let status = if outcome.is_ok() { "ok" } else { "error" };
        metrics::counter!("tiercache_requests_total", "backend" => self.backend_class(), "operation" => operation, "status" => status).increment(1);
        metrics::gauge!("tiercache_circuit_breaker_state", "backend" => self.backend_class())
            .set(f64::from(self.breaker_state() as u8));
    }

    fn wrap_and_serialize(
        &self,
        value: V,
        ttl: Option<i64>,
        dependency: Option<DependencyMetadata>,
    ) -> (Vec<u8>, Option<i64>) {
        let expires_at = ttl.filter(|t| *t > 0).map(|t| self.clock.now() + t);
        let wrapped = WrappedValue::new(value, expires_at, dependency);
        // Serialization failure degrades to an empty payload (a miss on read).
        let bytes = serde_json::to_vec(&wrapped).unwrap_or_default();
        (bytes, ttl)
    }

    /// Unconditionally stores `value`, wrapped with `ttl`/`dependency`.
    ///
    /// # Errors
    ///
    /// [`LayerError::Unavailable`] if the breaker is open;
    /// [`LayerError::Backend`] on a backend failure.
    pub fn set_value(
        &self,
        key: &str,
        value: V,
        ttl: Option<i64>,
        dependency: Option<DependencyMetadata>,
    ) -> Result<bool, LayerError> {
        if !self.breaker.allows_request() {
            metrics::counter!("tiercache_requests_total", "backend" => self.backend_class(), "operation" => "set", "status" => "rejected").increment(1);
            return Err(LayerError::Unavailable);
        }
        let (bytes, backend_ttl) = self.wrap_and_serialize(value, ttl, dependency);
        let outcome = match self.backend.set(key, bytes, backend_ttl) {
            Ok(accepted) => {
                self.breaker.record_success();
                Ok(accepted)
            },
            Err(e) => {
                self.breaker.record_failure();
                Err(LayerError::Backend(e))
            },
        };
        self.record_call_metrics("set", &outcome);
        outcome
    }

    /// Stores `value` only if `key` is absent, wrapped the same way as
    /// [`GuardedLayer::set_value`].
    ///
    /// # Errors
    ///
    /// See [`GuardedLayer::set_value`].
    pub fn add_value(
        &self,
        key: &str,
        value: V,
        ttl: Option<i64>,
        dependency: Option<DependencyMetadata>,
    ) -> Result<bool, LayerError> {
        if !self.breaker.allows_request() {
            metrics::counter!("tiercache_requests_total", "backend" => self.backend_class(), "operation" => "add", "status" => "rejected").increment(1);
            return Err(LayerError::Unavailable);
        }
        let (bytes, backend_ttl) = self.wrap_and_serialize(value, ttl, dependency);
        let outcome = match self.backend.add(key, bytes, backend_ttl) {
            Ok(accepted) => {
                self.breaker.record_success();
                Ok(accepted)
            },
            Err(e) => {
                self.breaker.record_failure();
                Err(LayerError::Backend(e))
            },
        };
        self.record_call_metrics("add", &outcome);
        outcome
    }

    /// Deletes `key`: returns the backend's own boolean, treated as
    /// success regardless of prior presence.
    ///
    /// # Errors
    ///
    /// [`LayerError::Unavailable`] if the breaker is open;
    /// [`LayerError::Backend`] on a backend failure.
    pub fn delete_value(&self, key: &str) -> Result<bool, LayerError> {
        if !self.breaker.allows_request() {
            metrics::counter!("tiercache_requests_total", "backend" => self.backend_class(), "operation" => "delete", "status" => "rejected").increment(1);
            return Err(LayerError::Unavailable);
        }
        let outcome = match self.backend.delete(key) {
            Ok(result) => {
                self.breaker.record_success();
                Ok(result)
            },
            Err(e) => {
                self.breaker.record_failure();
                Err(LayerError::Backend(e))
            },
        };
        self.record_call_metrics("delete", &outcome);
        outcome
    }

    /// Clears this tier's backend entirely.
    ///
    /// # Errors
    ///
    /// See [`GuardedLayer::delete_value`].
    pub fn flush(&self) -> Result<bool, LayerError> {
        if !self.breaker.allows_request() {
            metrics::counter!("tiercache_requests_total", "backend" => self.backend_class(), "operation" => "flush", "status" => "rejected").increment(1);
            return Err(LayerError::Unavailable);
        }
        let outcome = match self.backend.flush() {
            Ok(result) => {
                self.breaker.record_success();
                Ok(result)
            },
            Err(e) => {
                self.breaker.record_failure();
                Err(LayerError::Backend(e))
            },
        };
        self.record_call_metrics("flush", &outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory_backend::MemoryBackend;
    use crate::clock::TestClock;
    use crate::config::{BreakerConfig, LayerConfig};

    fn layer(clock: Arc<dyn Clock>) -> GuardedLayer<String> {
        let backend = Box::new(MemoryBackend::new("memory", clock.clone()));
        GuardedLayer::new(backend, &LayerConfig::new("memory"), clock)
    }

    #[test]
    fn set_then_get_round_trips_and_computes_expiry() {
        let clock = Arc::new(TestClock::new(1_000));
        let l = layer(clock);
        assert!(l.set_value("k", "v".to_string(), Some(60), None).expect("set"));
        let got = l.get_value("k", false).expect("get").expect("hit");
        assert_eq!(got.value(), "v");
        assert_eq!(got.expires_at(), Some(1_060));
    }

    #[test]
    fn zero_ttl_means_no_facade_expiry() {
        let clock = Arc::new(TestClock::new(0));
        let l = layer(clock);
        l.set_value("k", "v".to_string(), Some(0), None).expect("set");
        let got = l.get_value("k", false).expect("get").expect("hit");
        assert_eq!(got.expires_at(), None);
    }

    #[test]
    fn non_strict_mode_auto_wraps_legacy_raw_value() {
        let clock = Arc::new(TestClock::new(0));
        let backend = MemoryBackend::new("memory", clock.clone());
        backend.write_raw("legacy", serde_json::to_vec("raw").expect("json"));
        let l = GuardedLayer::<String>::new(Box::new(backend), &LayerConfig::new("memory"), clock);
        let got = l.get_value("legacy", false).expect("get").expect("hit");
        assert_eq!(got.value(), "raw");
        assert_eq!(got.expires_at(), None);
    }

    #[test]
    fn strict_mode_rejects_legacy_raw_value_as_breaker_failure() {
        let clock = Arc::new(TestClock::new(0));
        let backend = MemoryBackend::new("memory", clock.clone());
        backend.write_raw("legacy", serde_json::to_vec("raw").expect("json"));
        let l = GuardedLayer::<String>::new(Box::new(backend), &LayerConfig::new("memory"), clock);
        let err = l.get_value("legacy", true).expect_err("strict rejects");
        assert!(matches!(err, LayerError::Format(_)));
        assert_eq!(l.breaker_stats().failures, 1);
    }

    #[test]
    fn open_breaker_rejects_without_touching_backend() {
        let clock = Arc::new(TestClock::new(0));
        let l = layer(clock);
        l.force_open();
        assert!(matches!(l.get_value("k", false), Err(LayerError::Unavailable)));
        assert!(matches!(
            l.set_value("k", "v".to_string(), Some(1), None),
            Err(LayerError::Unavailable)
        ));
    }

    #[test]
    fn backend_failure_counts_as_breaker_failure() {
        let clock = Arc::new(TestClock::new(0));
        let backend = MemoryBackend::new("memory", clock.clone());
        backend.set_failing(true);
        let cfg = LayerConfig::new("memory").with_breaker(BreakerConfig::default().with_window_size(1));
        let l = GuardedLayer::<String>::new(Box::new(backend), &cfg, clock);
        assert!(l.get_value("k", false).is_err());
        assert_eq!(l.breaker_state(), CircuitState::Open);
    }
}
