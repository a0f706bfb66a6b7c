//! The set of features active for one project.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use crate::config::ConfigRegistry;
use crate::dispatcher::EventDispatcher;
use crate::error::{ConflictError, FeatureSetError, FeatureSetResult};
use crate::event::EventNames;
use crate::feature::Feature;
use crate::priority::Priority;
use crate::registry::FeatureCatalog;

/// Active features, validated against each other.
///
/// Construction fails if a requested name is unknown or if any two active
/// features conflict, whichever of the two declared the conflict.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    features: Vec<Rc<dyn Feature>>,
}

impl FeatureSet {
    /// Resolve `names` against `catalog` and validate conflicts.
    ///
    /// Activation order is the order of first appearance in `names`;
    /// duplicates are ignored.
    pub fn build<S: AsRef<str>>(catalog: &FeatureCatalog, names: &[S]) -> FeatureSetResult<Self> {
        let mut features: Vec<Rc<dyn Feature>> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if features.iter().any(|f| f.name() == name) {
                continue;
            }
            let feature = catalog
                .get(name)
                .ok_or_else(|| FeatureSetError::UnknownFeature(name.to_string()))?;
            features.push(Rc::clone(feature));
        }

        for (i, first) in features.iter().enumerate() {
            for second in &features[i + 1..] {
                if first.conflicts_with(second.name()) || second.conflicts_with(first.name()) {
                    return Err(ConflictError::Features {
                        first: first.name().to_string(),
                        second: second.name().to_string(),
                    }
                    .into());
                }
            }
        }

        debug!(features = ?features.iter().map(|f| f.name()).collect::<Vec<_>>(), "feature set built");
        Ok(Self { features })
    }

    /// Active feature names in activation order.
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name()).collect()
    }

    /// Active features in activation order.
    pub fn features(&self) -> &[Rc<dyn Feature>] {
        &self.features
    }

    /// Whether `name` is active.
    pub fn contains(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.name() == name)
    }

    /// Number of active features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether no feature is active.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Build a dispatcher with every active feature's bindings.
    pub fn dispatcher(&self, events: &EventNames) -> EventDispatcher {
        let mut dispatcher = EventDispatcher::new();
        for feature in &self.features {
            for binding in feature.bindings(events) {
                dispatcher.subscribe_binding(feature.name(), &binding);
            }
        }
        dispatcher
    }

    /// Build a config registry declaring every active feature's config.
    pub fn config_registry(&self) -> ConfigRegistry {
        let mut registry = ConfigRegistry::new();
        for feature in &self.features {
            let factory = Rc::clone(feature);
            registry.declare(feature.name(), move || factory.create_config());
        }
        registry
    }

    /// Resolved (feature, priority) order per event name.
    pub fn dispatch_plan(&self, events: &EventNames) -> BTreeMap<String, Vec<(String, Priority)>> {
        let dispatcher = self.dispatcher(events);
        let plan: BTreeMap<String, Vec<(String, Priority)>> = dispatcher
            .events()
            .into_iter()
            .map(|event| {
                let plan: Vec<(String, Priority)> = dispatcher
                    .plan(event)
                    .into_iter()
                    .map(|(feature, priority)| (feature.to_string(), priority))
                    .collect();
                (event.to_string(), plan)
            })
            .collect();
        plan
    }
}
