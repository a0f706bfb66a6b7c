//! Per-feature configuration and the registry that owns it.
//!
//! Every active feature gets exactly one config instance per session. The
//! instance is created on first access and shared from then on, so a value
//! written by one handler is what every later reader sees.
//!
//! Any feature may read another feature's config. Writing to another
//! feature's config is allowed by the API but should be limited to the
//! mutators that feature documents for that purpose.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::rc::Rc;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Base trait for feature configuration types.
///
/// # Example
///
/// ```rust
/// use featurekit::FeatureConfig;
/// use std::any::Any;
///
/// #[derive(Debug, Default)]
/// struct LintConfig {
///     strict: bool,
/// }
///
/// impl FeatureConfig for LintConfig {
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
///
///     fn as_any_mut(&mut self) -> &mut dyn Any {
///         self
///     }
/// }
/// ```
pub trait FeatureConfig: Any + Debug {
    /// Downcast to the concrete config type.
    fn as_any(&self) -> &dyn Any;

    /// Mutably downcast to the concrete config type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Config for features that carry no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyConfig;

impl FeatureConfig for EmptyConfig {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Builds a fresh config instance for one feature.
pub type ConfigFactory = Rc<dyn Fn() -> Box<dyn FeatureConfig>>;

/// Shared handle to a config instance.
pub type SharedConfig = Rc<RefCell<Box<dyn FeatureConfig>>>;

/// Holds one lazily created config per feature name.
#[derive(Default)]
pub struct ConfigRegistry {
    factories: HashMap<String, ConfigFactory>,
    instances: RefCell<HashMap<String, SharedConfig>>,
    created: RefCell<Vec<String>>,
}

impl ConfigRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the config factory for a feature name.
    ///
    /// Declaring a name again replaces the factory but keeps an instance that
    /// was already created.
    pub fn declare<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn FeatureConfig> + 'static,
    {
        self.factories.insert(name.into(), Rc::new(factory));
    }

    /// Check whether a config is declared under this name.
    pub fn is_declared(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Get the config instance for a feature, creating it on first access.
    pub fn get(&self, name: &str) -> ConfigResult<SharedConfig> {
        if let Some(existing) = self.instances.borrow().get(name) {
            return Ok(Rc::clone(existing));
        }

        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownFeature(name.to_string()))?;

        debug!(feature = name, "creating feature config");
        let instance: SharedConfig = Rc::new(RefCell::new(factory()));
        self.instances
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&instance));
        self.created.borrow_mut().push(name.to_string());
        Ok(instance)
    }

    /// Run `f` against the typed config of a feature.
    pub fn read<T, R>(&self, name: &str, f: impl FnOnce(&T) -> R) -> ConfigResult<R>
    where
        T: FeatureConfig,
    {
        let shared = self.get(name)?;
        let config = shared
            .try_borrow()
            .map_err(|_| ConfigError::Borrowed(name.to_string()))?;
        let typed = config
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| mismatch::<T>(name))?;
        Ok(f(typed))
    }

    /// Run a fallible mutation against the typed config of a feature.
    pub fn update<T, R, E>(&self, name: &str, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E>
    where
        T: FeatureConfig,
        E: From<ConfigError>,
    {
        let shared = self.get(name)?;
        let mut config = shared
            .try_borrow_mut()
            .map_err(|_| ConfigError::Borrowed(name.to_string()))?;
        let typed = config
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| mismatch::<T>(name))?;
        f(typed)
    }

    /// Names whose config has been created, in creation order.
    pub fn instantiated(&self) -> Vec<String> {
        self.created.borrow().clone()
    }
}

fn mismatch<T>(name: &str) -> ConfigError {
    ConfigError::TypeMismatch {
        feature: name.to_string(),
        expected: type_name::<T>(),
    }
}

impl Debug for ConfigRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut declared: Vec<&String> = self.factories.keys().collect();
        declared.sort();
        f.debug_struct("ConfigRegistry")
            .field("declared", &declared)
            .field("instantiated", &self.created.borrow())
            .finish()
    }
}
