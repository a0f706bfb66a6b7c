//! Catalog of known features.
//!
//! The `FeatureCatalog` holds every feature a project may activate, keyed by
//! name and kept in registration order. A `FeatureSet` resolves requested
//! names against it.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{RegistryError, RegistryResult};
use crate::feature::Feature;
use crate::features;

/// A catalog of known features.
///
/// # Example
///
/// ```rust
/// use featurekit::FeatureCatalog;
///
/// let catalog = FeatureCatalog::with_builtins();
///
/// assert!(catalog.get("git").is_some());
/// assert!(catalog.get("unknown").is_none());
/// ```
#[derive(Debug, Default)]
pub struct FeatureCatalog {
    features: HashMap<String, Rc<dyn Feature>>,
    ordered: Vec<String>,
}

impl FeatureCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding every builtin feature.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for feature in features::builtins() {
            catalog.register(feature);
        }
        catalog
    }

    /// Register a feature.
    ///
    /// The feature is registered under its name. If a feature with the same
    /// name already exists, it will be replaced.
    pub fn register(&mut self, feature: Rc<dyn Feature>) {
        let name = feature.name().to_string();
        if !self.features.contains_key(&name) {
            self.ordered.push(name.clone());
        }
        self.features.insert(name, feature);
    }

    /// Register a feature, returning an error if already registered.
    pub fn register_unique(&mut self, feature: Rc<dyn Feature>) -> RegistryResult<()> {
        let name = feature.name().to_string();
        if name.is_empty() || name.contains(char::is_whitespace) || name.contains('.') {
            return Err(RegistryError::InvalidName(name));
        }
        if self.features.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.ordered.push(name.clone());
        self.features.insert(name, feature);
        Ok(())
    }

    /// Get a feature by name.
    pub fn get(&self, name: &str) -> Option<&Rc<dyn Feature>> {
        self.features.get(name)
    }

    /// Check if a feature with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Remove a feature by name.
    pub fn remove(&mut self, name: &str) -> Option<Rc<dyn Feature>> {
        self.ordered.retain(|n| n != name);
        self.features.remove(name)
    }

    /// Get the names of all registered features.
    pub fn names(&self) -> Vec<&str> {
        self.ordered.iter().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterate over all features in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn Feature>> {
        self.ordered
            .iter()
            .filter_map(move |name| self.features.get(name))
    }
}

/// Builder for creating catalogs with fluent API.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: FeatureCatalog,
}

impl CatalogBuilder {
    /// Create a new catalog builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature to the catalog.
    pub fn with<F: Feature + 'static>(mut self, feature: F) -> Self {
        self.catalog.register(Rc::new(feature));
        self
    }

    /// Build the catalog.
    pub fn build(self) -> FeatureCatalog {
        self.catalog
    }
}
