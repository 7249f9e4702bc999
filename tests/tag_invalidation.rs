//! Scenario: two layers, values written with a tag-based dependency;
//! invalidating one tag marks every dependent entry changed while
//! leaving entries under an unrelated tag untouched. Deciding whether a
//! changed dependency means "miss" is left to the caller, matching how
//! the cascade hands back a recreated dependency for the host framework
//! to validate rather than enforcing that policy itself.

mod common;

use common::SharedBackend;
use std::sync::Arc;
use tiercache::cache::{MemoryBackend, TagDependency, TagRegistry};
use tiercache::clock::TestClock;
use tiercache::config::{CoordinatorConfig, LayerConfig};
use tiercache::{DependencyRegistry, TieredCoordinatorBuilder};

#[test]
fn invalidating_a_tag_marks_only_its_dependents_changed() {
    let clock = Arc::new(TestClock::new(0));
    let tag_registry = TagRegistry::new();
    let mut dependency_registry = DependencyRegistry::new();
    tag_registry.register_into(&mut dependency_registry);

    let mut builder = TieredCoordinatorBuilder::<String>::new(CoordinatorConfig::default())
        .with_clock(clock.clone())
        .with_dependency_registry(dependency_registry);
    for i in 0..2 {
        let backend = Arc::new(MemoryBackend::new(Box::leak(format!("l{i}").into_boxed_str()), clock.clone()));
        builder = builder.add_layer(Box::new(SharedBackend(backend)), LayerConfig::new("memory"));
    }
    let coordinator = builder.build().expect("two layers build");

    let users = TagDependency::new(vec!["users".to_string()], tag_registry.clone());
    coordinator.set_with_dependency("u1", "D1".to_string(), 3600, &users);
    coordinator.set_with_dependency("u2", "D2".to_string(), 3600, &users);

    let orders = TagDependency::new(vec!["orders".to_string()], tag_registry.clone());
    coordinator.set_with_dependency("o1", "O".to_string(), 3600, &orders);

    tag_registry.invalidate_tag("users", 1);

    let (u1_value, u1_dep) = coordinator.get("u1").expect("u1 hit");
    assert_eq!(u1_value, "D1");
    assert!(u1_dep.expect("dependency recreated").is_changed(1));

    let (u2_value, u2_dep) = coordinator.get("u2").expect("u2 hit");
    assert_eq!(u2_value, "D2");
    assert!(u2_dep.expect("dependency recreated").is_changed(1));

    let (o1_value, o1_dep) = coordinator.get("o1").expect("o1 hit");
    assert_eq!(o1_value, "O");
    assert!(!o1_dep.expect("dependency recreated").is_changed(1));
}
