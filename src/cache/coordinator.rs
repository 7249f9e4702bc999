//! Tiered coordinator: read cascade, write propagation, recovery
//! populate, delete/flush fan-out, and the admin surface.

use super::breaker::{BreakerStats, CircuitState};
use super::dependency::{Dependency, DependencyMetadata, DependencyRegistry};
use super::layer::{GuardedLayer, LayerError};
use crate::clock::{Clock, SystemClock};
use crate::config::{CoordinatorConfig, LayerConfig, RecoveryStrategy, WriteStrategy};
use crate::cache::backend::Backend;
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Per-tier status snapshot.
#[derive(Debug, Clone)]
pub struct LayerStatus {
    /// Priority index (0 = highest priority).
    pub index: usize,
    /// The backend's class identifier.
    pub backend_class: &'static str,
    /// The breaker's class identifier (always `CircuitBreaker` in this
    /// crate: there is only one breaker implementation to plug in here).
    pub breaker_class: &'static str,
    /// The breaker's current state.
    pub state: CircuitState,
    /// The breaker's current sliding-window statistics.
    pub stats: BreakerStats,
}

/// The tiered cache façade.
///
/// Generic over the stored value type `V`; every layer in the stack
/// shares the same `V`. Construct via [`TieredCoordinatorBuilder`].
pub struct TieredCoordinator<V> {
    layers: Vec<GuardedLayer<V>>,
    config: CoordinatorConfig,
    dependency_registry: DependencyRegistry,
    clock: Arc<dyn Clock>,
}

impl<V> TieredCoordinator<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Reads `key`, cascading through tiers in priority order until a
    /// non-expired wrapped value is found.
    ///
    /// Returns the pair `(value, recreated_dependency)` the host
    /// framework would validate against the current world, or `None` on
    /// a full-cascade miss. On a deeper-tier hit, healthy higher tiers
    /// are back-filled when [`RecoveryStrategy::Populate`] is configured.
    pub fn get(&self, key: &str) -> Option<(V, Option<Box<dyn Dependency>>)> {
        for (index, layer) in self.layers.iter().enumerate() {
            match layer.get_value(key, self.config.strict_mode) {
                Err(LayerError::Unavailable) => continue,
                Err(LayerError::Backend(e)) => {
                    tracing::warn!(layer = index, error = %e, "tier get failed");
                    continue;
                },
                Err(LayerError::Format(detail)) => {
                    tracing::warn!(layer = index, detail, "tier payload format error");
                    continue;
                },
                Ok(None) => continue,
                Ok(Some(wrapped)) => {
                    let now = self.clock.now();
                    if wrapped.expired(now) {
                        continue;
                    }

                    let dependency_meta = wrapped.dependency().cloned();
                    let value = wrapped.value().clone();

                    if index > 0 && self.config.recovery_strategy == RecoveryStrategy::Populate {
                        self.populate(
                            index,
                            key,
                            &value,
                            wrapped.expires_at(),
                            dependency_meta.as_ref(),
                        );
                    }

                    let recreated = dependency_meta
                        .as_ref()
                        .and_then(|meta| match meta.recreate(&self.dependency_registry) {
                            Ok(dep) => Some(dep),
                            Err(e) => {
                                tracing::warn!(layer = index, error = %e, "dependency recreate failed");
                                None
                            },
                        });
                    return Some((value, recreated));
                },
            }
        }
        None
    }

    /// Back-fills every healthy (`CLOSED`) tier above `hit_index` with
    /// `value`, clamped to each tier's own TTL ceiling.
    fn populate(
        &self,
        hit_index: usize,
        key: &str,
        value: &V,
        source_expires_at: Option<i64>,
        dependency: Option<&DependencyMetadata>,
    ) {
        let now = self.clock.now();
        for layer in &self.layers[..hit_index] {
            if layer.breaker_state() != CircuitState::Closed {
                continue;
            }
            let remaining = Self::remaining_ttl(source_expires_at, layer.layer_ttl(), now);
            if let Err(e) = layer.set_value(key, value.clone(), Some(remaining), dependency.cloned()) {
                tracing::warn!(error = %e, "recovery populate failed");
            }
        }
    }

    /// Remaining-TTL calculation for back-fill.
    fn remaining_ttl(source_expires_at: Option<i64>, layer_ttl: Option<i64>, now: i64) -> i64 {
        match source_expires_at {
            None => layer_ttl.unwrap_or(0),
            Some(expires_at) => {
                let mut remaining = (expires_at - now).max(1);
                if let Some(ttl) = layer_ttl {
                    if ttl > 0 {
                        remaining = remaining.min(ttl);
                    }
                }
                remaining
            },
        }
    }

    /// `ttl_i = min(requestedTtl, layerTtl)` when `layerTtl > 0`, else
    /// `requestedTtl`.
    fn effective_ttl(requested_ttl: i64, layer_ttl: Option<i64>) -> i64 {
        match layer_ttl {
            Some(ttl) if ttl > 0 => requested_ttl.min(ttl),
            _ => requested_ttl,
        }
    }

    fn write(&self, key: &str, value: V, ttl: i64, dependency: Option<DependencyMetadata>, is_add: bool) -> bool {
        match self.config.write_strategy {
            WriteStrategy::First => {
                for (index, layer) in self.layers.iter().enumerate() {
                    let effective_ttl = Self::effective_ttl(ttl, layer.layer_ttl());
                    let outcome = if is_add {
                        layer.add_value(key, value.clone(), Some(effective_ttl), dependency.clone())
                    } else {
                        layer.set_value(key, value.clone(), Some(effective_ttl), dependency.clone())
                    };
                    match outcome {
                        Ok(true) => return true,
                        Ok(false) => {},
                        Err(e) => tracing::warn!(layer = index, error = %e, "write failed"),
                    }
                }
                false
            },
            WriteStrategy::Through => {
                let mut any_succeeded = false;
                for (index, layer) in self.layers.iter().enumerate() {
                    let effective_ttl = Self::effective_ttl(ttl, layer.layer_ttl());
                    let outcome = if is_add {
                        layer.add_value(key, value.clone(), Some(effective_ttl), dependency.clone())
                    } else {
                        layer.set_value(key, value.clone(), Some(effective_ttl), dependency.clone())
                    };
                    match outcome {
                        Ok(true) => any_succeeded = true,
                        Ok(false) => {},
                        Err(e) => tracing::warn!(layer = index, error = %e, "write failed"),
                    }
                }
                any_succeeded
            },
        }
    }

    /// Unconditionally stores `value` at `key` with TTL `ttl` seconds,
    /// fanning out per the configured [`WriteStrategy`].
    ///
    /// This is the typed equivalent of a legacy two-element
    /// `(value, dependency=null)` write envelope, split into distinct
    /// `set`/`set_with_dependency` entry points instead (see DESIGN.md).
    pub fn set(&self, key: &str, value: V, ttl: i64) -> bool {
        self.write(key, value, ttl, None, false)
    }

    /// Like [`TieredCoordinator::set`], but also captures a snapshot of
    /// `dependency` alongside the value (the typed equivalent of a
    /// non-null second envelope element).
    pub fn set_with_dependency(&self, key: &str, value: V, ttl: i64, dependency: &dyn Dependency) -> bool {
        let meta = DependencyMetadata::from_dependency(dependency);
        self.write(key, value, ttl, Some(meta), false)
    }

    /// Stores `value` at `key` only where a tier's backend accepts an
    /// add-if-absent, fanning out per the configured [`WriteStrategy`].
    pub fn add(&self, key: &str, value: V, ttl: i64) -> bool {
        self.write(key, value, ttl, None, true)
    }

    /// Like [`TieredCoordinator::add`], with a dependency snapshot.
    pub fn add_with_dependency(&self, key: &str, value: V, ttl: i64, dependency: &dyn Dependency) -> bool {
        let meta = DependencyMetadata::from_dependency(dependency);
        self.write(key, value, ttl, Some(meta), true)
    }

    /// Deletes `key` from every tier unconditionally; `true` if any tier
    /// succeeded. Ignores [`WriteStrategy`].
    pub fn delete(&self, key: &str) -> bool {
        let mut any_succeeded = false;
        for (index, layer) in self.layers.iter().enumerate() {
            match layer.delete_value(key) {
                Ok(true) => any_succeeded = true,
                Ok(false) => {},
                Err(e) => tracing::warn!(layer = index, error = %e, "delete failed"),
            }
        }
        any_succeeded
    }

    /// Clears every tier unconditionally; `true` if any tier succeeded.
    pub fn flush(&self) -> bool {
        let mut any_succeeded = false;
        for (index, layer) in self.layers.iter().enumerate() {
            match layer.flush() {
                Ok(true) => any_succeeded = true,
                Ok(false) => {},
                Err(e) => tracing::warn!(layer = index, error = %e, "flush failed"),
            }
        }
        any_succeeded
    }

    /// Per-tier status snapshot.
    pub fn layer_status(&self) -> Vec<LayerStatus> {
        self.layers
            .iter()
            .enumerate()
            .map(|(index, layer)| LayerStatus {
                index,
                backend_class: layer.backend_class(),
                breaker_class: "CircuitBreaker",
                state: layer.breaker_state(),
                stats: layer.breaker_stats(),
            })
            .collect()
    }

    /// Admin: forces tier `index`'s breaker open. A no-op on an
    /// out-of-range index.
    pub fn force_layer_open(&self, index: usize) {
        if let Some(layer) = self.layers.get(index) {
            layer.force_open();
        }
    }

    /// Admin: forces tier `index`'s breaker closed. A no-op on an
    /// out-of-range index.
    pub fn force_layer_close(&self, index: usize) {
        if let Some(layer) = self.layers.get(index) {
            layer.force_close();
        }
    }

    /// Admin: resets every tier's breaker to an empty closed state.
    pub fn reset_circuit_breakers(&self) {
        for layer in &self.layers {
            layer.reset_breaker();
        }
    }
}

/// Builds a [`TieredCoordinator`], validating its construction
/// invariants (non-empty layer vector, well-formed breaker configs).
pub struct TieredCoordinatorBuilder<V> {
    layers: Vec<GuardedLayer<V>>,
    config: CoordinatorConfig,
    dependency_registry: DependencyRegistry,
    clock: Arc<dyn Clock>,
    pending_error: Option<Error>,
}

impl<V> TieredCoordinatorBuilder<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Starts a builder with the given coordinator-wide configuration and
    /// the system wall clock.
    #[must_use]
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            layers: Vec::new(),
            config,
            dependency_registry: DependencyRegistry::new(),
            clock: Arc::new(SystemClock),
            pending_error: None,
        }
    }

    /// Overrides the clock (tests inject a [`crate::clock::TestClock`]).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Overrides the dependency registry (defaults to an empty one, which
    /// is sufficient if callers never write with a dependency).
    #[must_use]
    pub fn with_dependency_registry(mut self, registry: DependencyRegistry) -> Self {
        self.dependency_registry = registry;
        self
    }

    /// Appends the lowest-priority-so-far tier backed by `backend`.
    ///
    /// If `layer_config`'s breaker settings are invalid, the error is
    /// deferred and surfaced by [`TieredCoordinatorBuilder::build`].
    #[must_use]
    pub fn add_layer(mut self, backend: Box<dyn Backend>, layer_config: LayerConfig) -> Self {
        if let Err(e) = layer_config.breaker.validate() {
            self.pending_error.get_or_insert(e);
        }
        let layer = GuardedLayer::new(backend, &layer_config, self.clock.clone());
        self.layers.push(layer);
        self
    }

    /// Validates and constructs the coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no layers were added, or if
    /// any layer added via [`TieredCoordinatorBuilder::add_layer`] carried
    /// an invalid breaker configuration.
    pub fn build(self) -> Result<TieredCoordinator<V>> {
        if let Some(e) = self.pending_error {
            return Err(e);
        }
        if self.layers.is_empty() {
            return Err(Error::Configuration {
                detail: "tiered coordinator requires at least one layer".to_string(),
            });
        }
        Ok(TieredCoordinator {
            layers: self.layers,
            config: self.config,
            dependency_registry: self.dependency_registry,
            clock: self.clock,
        })
    }
}


#[cfg(test)]
mod ttl_arithmetic_properties {
    use super::TieredCoordinator;
    use proptest::prelude::*;

    proptest! {
        /// `effective_ttl` never exceeds either input, and equals the
        /// requested TTL whenever there is no positive ceiling.
        #[test]
        fn effective_ttl_is_bounded_by_both_inputs(
            requested_ttl in 0i64..1_000_000,
            layer_ttl in prop::option::of(-10i64..1_000_000),
        ) {
            let effective = TieredCoordinator::<String>::effective_ttl(requested_ttl, layer_ttl);
            prop_assert!(effective <= requested_ttl);
            match layer_ttl {
                Some(ttl) if ttl > 0 => prop_assert!(effective <= ttl),
                _ => prop_assert_eq!(effective, requested_ttl),
            }
        }

        /// Remaining TTL for back-fill is never negative, and never
        /// exceeds the source entry's own remaining lifetime.
        #[test]
        fn remaining_ttl_is_non_negative_and_bounded_by_source(
            now in 0i64..1_000_000,
            extra in 1i64..10_000,
            layer_ttl in prop::option::of(0i64..1_000_000),
        ) {
            let source_expires_at = now + extra;
            let remaining = TieredCoordinator::<String>::remaining_ttl(Some(source_expires_at), layer_ttl, now);
            prop_assert!(remaining >= 1);
            prop_assert!(remaining <= extra);
            if let Some(ttl) = layer_ttl {
                if ttl > 0 {
                    prop_assert!(remaining <= ttl);
                }
            }
        }

        /// With no source expiry, back-fill falls back to the tier's own
        /// ceiling, or zero when the tier enforces none.
        #[test]
        fn remaining_ttl_with_no_source_expiry_uses_layer_ceiling(
            now in 0i64..1_000_000,
            layer_ttl in prop::option::of(0i64..1_000_000),
        ) {
            let remaining = TieredCoordinator::<String>::remaining_ttl(None, layer_ttl, now);
            prop_assert_eq!(remaining, layer_ttl.unwrap_or(0));
        }
    }
}
