//! Session-wide settings.
//!
//! Settings are passed explicitly to a `GenerationSession` and reach handlers
//! through the event context. There is no process-wide state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::event::{EventNames, DEFAULT_NAMESPACE};

/// Template variables handed to renderers.
pub type Variables = BTreeMap<String, String>;

/// Settings for one generation run.
///
/// # Example
///
/// ```rust
/// use featurekit::Settings;
///
/// let settings = Settings::new("/tmp/project")
///     .with_namespace("acme")
///     .with_variable("name", "demo");
///
/// assert_eq!(settings.events().on_end(), "acme.on_end");
/// assert_eq!(settings.variables().get("name").map(String::as_str), Some("demo"));
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    project_dir: PathBuf,
    namespace: String,
    yapf_style_config: Option<PathBuf>,
    variables: Variables,
}

impl Settings {
    /// Create settings rooted at the given project directory.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            yapf_style_config: None,
            variables: Variables::new(),
        }
    }

    /// Set the event namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Use an explicit yapf style file instead of detecting one.
    pub fn with_yapf_style_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.yapf_style_config = Some(path.into());
        self
    }

    /// Add a template variable.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn yapf_style_config(&self) -> Option<&Path> {
        self.yapf_style_config.as_deref()
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Event names under this settings' namespace.
    pub fn events(&self) -> EventNames {
        EventNames::new(self.namespace.clone())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(".")
    }
}
