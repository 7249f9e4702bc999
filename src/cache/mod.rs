//! Tiered cache façade core.
//!
//! An ordered stack of heterogeneous cache backends presented as a single
//! key/value cache. Each tier is guarded by an independent circuit breaker
//! ([`breaker`]); values carried between tiers are wrapped with expiry and
//! optional tag-style dependency metadata ([`value`], [`dependency`]).
//! [`layer`] pairs one backend with one breaker; [`coordinator`] stitches
//! the layer stack into the read cascade, write-propagation, and
//! recovery-populate policies.

pub mod backend;
pub mod breaker;
pub mod coordinator;
pub mod dependency;
pub mod layer;
pub mod memory_backend;
pub mod value;

pub use backend::{Backend, BackendError};
pub use breaker::{BreakerStats, CircuitBreaker, CircuitState};
pub use coordinator::{LayerStatus, TieredCoordinator, TieredCoordinatorBuilder};
pub use dependency::{Dependency, DependencyMetadata, DependencyRegistry, TagDependency, TagRegistry};
pub use layer::GuardedLayer;
pub use memory_backend::MemoryBackend;
pub use value::WrappedValue;
