//! Demo binary for the tiered cache façade.
//!
//! Wires up a three-tier stack (hot/warm/cold) over the crate's own
//! in-memory demo backend and walks through a write, a cascading read, a
//! simulated middle-tier outage, and a forced-open admin override. Not
//! the product surface, just a runnable illustration of the read/write/
//! failover paths a real embedding would exercise.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]

use std::sync::Arc;
use tiercache::cache::MemoryBackend;
use tiercache::clock::SystemClock;
use tiercache::config::{BreakerConfig, CoordinatorConfig, LayerConfig};
use tiercache::{TieredCoordinatorBuilder, observability};

fn main() {
    let _ = dotenvy::dotenv();

    let _ = observability::init_from_env();

    let clock = Arc::new(SystemClock);

    let hot = MemoryBackend::new("hot", clock.clone());
    let warm = MemoryBackend::new("warm", clock.clone());
    let cold = MemoryBackend::new("cold", clock.clone());

    let breaker = BreakerConfig::from_env().with_window_size(4).with_failure_threshold(0.5);

    let built = TieredCoordinatorBuilder::<String>::new(CoordinatorConfig::from_env())
        .with_clock(clock)
        .add_layer(Box::new(hot), LayerConfig::new("hot").with_breaker(breaker))
        .add_layer(Box::new(warm), LayerConfig::new("warm").with_breaker(breaker))
        .add_layer(Box::new(cold), LayerConfig::new("cold"))
        .build();
    let coordinator = match built {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!(error = %e, "failed to build tiered coordinator");
            return;
        },
    };

    tracing::info!("writing 'greeting' through all three tiers");
    coordinator.set("greeting", "hello from tiercache".to_string(), 300);

    let hit = coordinator.get("greeting");
    tracing::info!(?hit, "read back through the cascade");

    tracing::info!("forcing the warm tier's breaker open to simulate an outage");
    coordinator.force_layer_open(1);

    let hit_during_outage = coordinator.get("greeting");
    tracing::info!(
        ?hit_during_outage,
        "read still succeeds: warm is skipped, hot already had it cached"
    );

    for status in coordinator.layer_status() {
        tracing::info!(
            layer = status.index,
            backend = status.backend_class,
            state = ?status.state,
            failures = status.stats.failures,
            total = status.stats.total,
            "tier status"
        );
    }

    coordinator.reset_circuit_breakers();
    tracing::info!("breakers reset; demo complete");
}
