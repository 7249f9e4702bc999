//! Dependency metadata subsystem.
//!
//! The generic "tag dependency" primitive lives in the host cache
//! framework this façade sits in front of; only its invalidation contract
//! is consumed here. [`Dependency`] is that contract: a trait with
//! `evaluate`/`is_changed`-shaped capabilities plus a variant registry so
//! [`DependencyMetadata::recreate`] can instantiate the right concrete
//! type from a recorded class name. [`TagDependency`] and [`TagRegistry`]
//! are a concrete instance of that contract: a minimal tag-invalidation
//! collaborator good enough to exercise the registry end to end.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A host-framework dependency instance, evaluated against the current
/// world and capable of reporting whether it has changed since it was
/// captured.
pub trait Dependency: Send + Sync {
    /// Concrete class identifier, recorded in [`DependencyMetadata`].
    fn class_name(&self) -> &'static str;

    /// Public, non-static configuration fields captured at write time,
    /// excluding the evaluated-data field.
    fn config(&self) -> HashMap<String, Value>;

    /// The evaluated-data snapshot this instance currently holds: the
    /// value captured at write time, or (after [`DependencyMetadata::recreate`])
    /// the value directly restored from storage.
    fn evaluated_data(&self) -> Value;

    /// Evaluates this dependency's condition against the current world
    /// (e.g. current tag-invalidation timestamps), independent of
    /// whatever this instance's `evaluated_data` currently holds.
    fn current_snapshot(&self, now: i64) -> Value;

    /// `true` if the world has moved since `evaluated_data` was captured.
    fn is_changed(&self, now: i64) -> bool {
        self.current_snapshot(now) != self.evaluated_data()
    }
}

/// Factory recreating a concrete [`Dependency`] from a recorded class
/// name, config, and evaluated-data snapshot, without re-evaluating.
type DependencyFactory =
    Box<dyn Fn(&HashMap<String, Value>, Value) -> Result<Box<dyn Dependency>> + Send + Sync>;

/// Maps a dependency class name to the factory that can recreate it.
///
/// Factories close over whatever shared state (e.g. a [`TagRegistry`])
/// the recreated instance needs to evaluate itself against the live
/// world.
#[derive(Default)]
pub struct DependencyRegistry {
    factories: HashMap<&'static str, DependencyFactory>,
}

impl DependencyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `class_name`.
    pub fn register(&mut self, class_name: &'static str, factory: DependencyFactory) {
        self.factories.insert(class_name, factory);
    }

    /// Recreates a dependency instance for `class_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDependencyClass`] if no factory was
    /// registered for `class_name`.
    pub fn recreate(
        &self,
        class_name: &str,
        config: &HashMap<String, Value>,
        evaluated_data: Value,
    ) -> Result<Box<dyn Dependency>> {
        self.factories
            .get(class_name)
            .ok_or_else(|| Error::UnknownDependencyClass(class_name.to_string()))
            .and_then(|factory| factory(config, evaluated_data))
    }
}

/// Serializable snapshot of a dependency object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyMetadata {
    class_name: String,
    config: HashMap<String, Value>,
    evaluated_data: Value,
}

impl DependencyMetadata {
    /// Captures a snapshot of `dependency` as it stood at write time.
    pub fn from_dependency(dependency: &dyn Dependency) -> Self {
        Self {
            class_name: dependency.class_name().to_string(),
            config: dependency.config(),
            evaluated_data: dependency.evaluated_data(),
        }
    }

    /// The recorded class identifier.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Instantiates a dependency of the recorded class populated with
    /// the *original* `evaluated_data`, directly restored, never
    /// re-evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDependencyClass`] if `registry` has no
    /// factory for this snapshot's class.
    pub fn recreate(&self, registry: &DependencyRegistry) -> Result<Box<dyn Dependency>> {
        registry.recreate(&self.class_name, &self.config, self.evaluated_data.clone())
    }
}

/// In-process registry recording a last-invalidated timestamp per tag.
///
/// Stands in for the host cache framework's tag-invalidation primitive,
/// which this crate does not reimplement in general. This is the
/// minimal concrete instance needed to invalidate by tag end to end.
#[derive(Clone, Default)]
pub struct TagRegistry {
    timestamps: Arc<Mutex<HashMap<String, i64>>>,
}

impl TagRegistry {
    /// Creates an empty tag registry (no tag has ever been invalidated).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `tag` as invalidated at `now`.
    pub fn invalidate_tag(&self, tag: &str, now: i64) {
        let mut timestamps = self
            .timestamps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        timestamps.insert(tag.to_string(), now);
    }

    /// The last-invalidated timestamp for `tag`, or `0` if never
    /// invalidated.
    #[must_use]
    pub fn timestamp(&self, tag: &str) -> i64 {
        let timestamps = self
            .timestamps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        timestamps.get(tag).copied().unwrap_or(0)
    }

    /// Registers the `TagDependency` factory for `registry`, closing over
    /// this tag registry so recreated instances can still evaluate
    /// against the live world.
    pub fn register_into(&self, registry: &mut DependencyRegistry) {
        let tags = self.clone();
        registry.register(
            TagDependency::CLASS_NAME,
            Box::new(move |config, evaluated_data| {
                TagDependency::from_snapshot(config, tags.clone(), evaluated_data)
            }),
        );
    }
}

/// A dependency whose condition is "none of these tags were invalidated
/// since this snapshot was taken".
pub struct TagDependency {
    tags: Vec<String>,
    registry: TagRegistry,
    evaluated: HashMap<String, i64>,
}

impl TagDependency {
    /// The class identifier recorded in [`DependencyMetadata`].
    pub const CLASS_NAME: &'static str = "TagDependency";

    /// Builds a dependency over `tags`, snapshotting each tag's current
    /// timestamp from `registry` as the evaluated-data baseline.
    #[must_use]
    pub fn new(tags: Vec<String>, registry: TagRegistry) -> Self {
        let evaluated = Self::snapshot(&tags, &registry);
        Self {
            tags,
            registry,
            evaluated,
        }
    }

    fn snapshot(tags: &[String], registry: &TagRegistry) -> HashMap<String, i64> {
        tags.iter()
            .map(|tag| (tag.clone(), registry.timestamp(tag)))
            .collect()
    }

    /// Recreates a `TagDependency` from a recorded `(config, evaluated_data)`
    /// pair, restoring `evaluated_data` directly rather than
    /// re-snapshotting the registry.
    fn from_snapshot(
        config: &HashMap<String, Value>,
        registry: TagRegistry,
        evaluated_data: Value,
    ) -> Result<Box<dyn Dependency>> {
        let tags: Vec<String> = config
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .ok_or_else(|| Error::InvalidDependencyEnvelope {
                detail: "TagDependency config missing 'tags' array".to_string(),
            })?;
        let evaluated: HashMap<String, i64> =
            serde_json::from_value(evaluated_data).map_err(|e| Error::InvalidDependencyEnvelope {
                detail: format!("TagDependency evaluated_data malformed: {e}"),
            })?;
        Ok(Box::new(Self {
            tags,
            registry,
            evaluated,
        }))
    }
}

impl Dependency for TagDependency {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn config(&self) -> HashMap<String, Value> {
        HashMap::from([("tags".to_string(), serde_json::json!(self.tags))])
    }

    fn evaluated_data(&self) -> Value {
        serde_json::json!(self.evaluated)
    }

    fn current_snapshot(&self, _now: i64) -> Value {
        serde_json::json!(Self::snapshot(&self.tags, &self.registry))
    }
}
