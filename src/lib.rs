//! # tiercache
//!
//! A tiered cache façade: an ordered stack of heterogeneous cache
//! backends (fast local memory, shared network caches, durable stores)
//! presented as a single key/value cache. Each tier is guarded by an
//! independent circuit breaker, and the coordinator implements explicit
//! read, write-propagation, and recovery-populate policies that preserve
//! cache coherence and bound TTLs per tier.
//!
//! ## What this crate does NOT do
//!
//! It does not ship backend drivers (no in-memory map, network KV
//! store, or SQL-backed store beyond the in-process demo backend used in
//! tests and examples), distributed coordination between instances,
//! background refresh, write quorums, cryptographic integrity of stored
//! values, or an eviction policy of its own (backends evict).
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tiercache::clock::SystemClock;
//! use tiercache::config::{CoordinatorConfig, LayerConfig};
//! use tiercache::cache::{MemoryBackend, TieredCoordinatorBuilder};
//!
//! let clock = Arc::new(SystemClock);
//! let coordinator = TieredCoordinatorBuilder::<String>::new(CoordinatorConfig::default())
//!     .with_clock(clock.clone())
//!     .add_layer(Box::new(MemoryBackend::new("hot", clock.clone())), LayerConfig::new("hot"))
//!     .add_layer(Box::new(MemoryBackend::new("warm", clock)), LayerConfig::new("warm"))
//!     .build()
//!     .expect("at least one layer");
//!
//! coordinator.set("greeting", "hello".to_string(), 60);
//! assert_eq!(coordinator.get("greeting").map(|(v, _)| v), Some("hello".to_string()));
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

pub mod cache;
pub mod clock;
pub mod config;
pub mod observability;

pub use cache::{
    Backend, BackendError, CircuitBreaker, CircuitState, Dependency, DependencyMetadata,
    DependencyRegistry, GuardedLayer, LayerStatus, MemoryBackend, TagDependency, TagRegistry,
    TieredCoordinator, TieredCoordinatorBuilder, WrappedValue,
};
pub use clock::{Clock, SystemClock};
pub use config::{CoordinatorConfig, LayerConfig, RecoveryStrategy, WriteStrategy};

/// Error type for tiercache operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait
/// implementations, the same convention the rest of this codebase family
/// follows.
///
/// | Variant | Raised when |
/// |---|---|
/// | `Configuration` | Construction-time failures: empty layer list, out-of-range breaker thresholds |
/// | `InvalidDependencyEnvelope` | A write-path dependency snapshot doesn't match its recorded class |
/// | `UnknownDependencyClass` | `DependencyMetadata::recreate` asked for an unregistered class id |
///
/// Per-tier backend failures are represented by
/// [`cache::layer::LayerError`] and never escape the guarded layer as
/// this crate-wide `Error`.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Construction-time configuration error.
    #[error("configuration error: {detail}")]
    Configuration {
        /// What was wrong with the configuration.
        detail: String,
    },

    /// A two-element write envelope carried a dependency the registry
    /// can't make sense of.
    #[error("invalid dependency envelope: {detail}")]
    InvalidDependencyEnvelope {
        /// Why the envelope was rejected.
        detail: String,
    },

    /// `DependencyMetadata::recreate` was asked to recreate a class id
    /// that isn't registered.
    #[error("unknown dependency class: {0}")]
    UnknownDependencyClass(String),
}

/// Result type alias for tiercache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
