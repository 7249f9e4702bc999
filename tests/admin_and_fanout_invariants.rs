//! Invariants around the admin surface and the ANY-SUCCESS fan-out rules
//! for delete/flush, independent of the write-propagation strategy.

mod common;

use common::SharedBackend;
use std::sync::Arc;
use tiercache::cache::MemoryBackend;
use tiercache::clock::TestClock;
use tiercache::config::{CoordinatorConfig, LayerConfig, WriteStrategy};
use tiercache::TieredCoordinatorBuilder;

fn three_layer_coordinator(
    clock: Arc<TestClock>,
    config: CoordinatorConfig,
) -> tiercache::TieredCoordinator<String> {
    let mut builder = TieredCoordinatorBuilder::<String>::new(config).with_clock(clock.clone());
    for i in 0..3 {
        let backend = MemoryBackend::new(Box::leak(format!("l{i}").into_boxed_str()), clock.clone());
        builder = builder.add_layer(Box::new(SharedBackend(Arc::new(backend))), LayerConfig::new("memory"));
    }
    builder.build().expect("three layers build")
}

#[test]
fn delete_and_flush_ignore_write_strategy_and_report_any_success() {
    let clock = Arc::new(TestClock::new(0));
    let coordinator =
        three_layer_coordinator(clock, CoordinatorConfig::default().with_write_strategy(WriteStrategy::First));

    coordinator.set("k", "v".to_string(), 60);
    assert!(coordinator.delete("k"));
    assert!(coordinator.get("k").is_none());

    coordinator.set("j", "v".to_string(), 60);
    assert!(coordinator.flush());
    assert!(coordinator.get("j").is_none());
}

#[test]
fn force_layer_open_and_close_are_noop_out_of_range() {
    let clock = Arc::new(TestClock::new(0));
    let coordinator = three_layer_coordinator(clock, CoordinatorConfig::default());

    // Out-of-range indices must not panic; they are simply ignored.
    coordinator.force_layer_open(50);
    coordinator.force_layer_close(50);

    assert!(coordinator.set("k", "v".to_string(), 60));
}

#[test]
fn forced_open_layer_is_unavailable_without_touching_its_backend() {
    let clock = Arc::new(TestClock::new(0));
    let coordinator = three_layer_coordinator(clock, CoordinatorConfig::default());

    coordinator.force_layer_open(0);
    let status = coordinator.layer_status();
    assert_eq!(status[0].state, tiercache::CircuitState::Open);

    coordinator.reset_circuit_breakers();
    let status = coordinator.layer_status();
    assert!(status.iter().all(|s| s.state == tiercache::CircuitState::Closed));
}
