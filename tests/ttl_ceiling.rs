//! Scenario: a tier's TTL ceiling clamps a much longer requested TTL,
//! and the clamped expiry is honored on read.

mod common;

use common::SharedBackend;
use std::sync::Arc;
use tiercache::cache::MemoryBackend;
use tiercache::clock::TestClock;
use tiercache::config::{CoordinatorConfig, LayerConfig};
use tiercache::{TieredCoordinatorBuilder, WrappedValue};

#[test]
fn layer_ttl_ceiling_clamps_and_then_expires() {
    let clock = Arc::new(TestClock::new(0));
    let backend = Arc::new(MemoryBackend::new("memory", clock.clone()));
    let coordinator = TieredCoordinatorBuilder::<String>::new(CoordinatorConfig::default())
        .with_clock(clock.clone())
        .add_layer(Box::new(SharedBackend(backend.clone())), LayerConfig::new("memory").with_ttl(2))
        .build()
        .expect("single layer builds");

    assert!(coordinator.set("k", "v".to_string(), 3600));

    let raw = backend.inspect_raw("k").expect("stored");
    let wrapped: WrappedValue<String> = serde_json::from_slice(&raw).expect("wrapped envelope");
    assert!(wrapped.expires_at().expect("has expiry") <= 2);

    clock.advance(3);
    assert!(coordinator.get("k").is_none());
}
