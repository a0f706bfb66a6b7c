//! The `Feature` trait and its event bindings.
//!
//! A feature is a declaration: a name, a config factory, the features it
//! conflicts with, and the handlers it binds to events. Features hold no
//! state of their own; everything mutable lives in their config.

use std::fmt::{self, Debug};
use std::path::PathBuf;
use std::rc::Rc;

use crate::config::FeatureConfig;
use crate::dispatcher::EventContext;
use crate::error::FeatureResult;
use crate::event::{Event, EventNames};
use crate::priority::Priority;

/// A subscribed event handler.
pub type Handler = Rc<dyn Fn(&mut Event<'_>, &EventContext<'_>) -> FeatureResult<()>>;

/// Box a closure as a `Handler`.
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Event<'_>, &EventContext<'_>) -> FeatureResult<()> + 'static,
{
    Rc::new(f)
}

/// One (event, handler, priority) subscription declared by a feature.
#[derive(Clone)]
pub struct Binding {
    event: String,
    priority: Priority,
    handler: Handler,
}

impl Binding {
    /// Bind `handler` to `event` at `priority`.
    pub fn new<F>(event: impl Into<String>, priority: Priority, handler: F) -> Self
    where
        F: Fn(&mut Event<'_>, &EventContext<'_>) -> FeatureResult<()> + 'static,
    {
        Self {
            event: event.into(),
            priority,
            handler: self::handler(handler),
        }
    }

    /// Event the handler subscribes to.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Dispatch priority; lower runs first.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Callback invoked on dispatch.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("event", &self.event)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// An artifact a feature owns and hands to its generate event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// A Makefile written to the given project-relative path
    Makefile(PathBuf),
}

/// A self-contained unit contributing configuration and event handlers.
///
/// # Example
///
/// ```rust
/// use featurekit::{Binding, EmptyConfig, EventNames, Feature, FeatureConfig, Priority};
///
/// #[derive(Debug)]
/// struct Hello;
///
/// impl Feature for Hello {
///     fn name(&self) -> &str {
///         "hello"
///     }
///
///     fn create_config(&self) -> Box<dyn FeatureConfig> {
///         Box::new(EmptyConfig)
///     }
///
///     fn bindings(&self, events: &EventNames) -> Vec<Binding> {
///         vec![Binding::new(events.on_start(), Priority::DEFAULT, |_, _| Ok(()))]
///     }
/// }
/// ```
pub trait Feature: Debug {
    /// Returns the unique name of this feature.
    ///
    /// The name keys the feature in the catalog and its config in the
    /// config registry.
    fn name(&self) -> &str;

    /// Names of features that cannot be active together with this one.
    fn conflicts(&self) -> &[&str] {
        &[]
    }

    /// Build a fresh config instance.
    fn create_config(&self) -> Box<dyn FeatureConfig>;

    /// Event subscriptions, in registration order.
    fn bindings(&self, events: &EventNames) -> Vec<Binding>;

    /// Artifact passed as payload to this feature's generate event.
    fn artifact(&self) -> Option<Artifact> {
        None
    }

    /// Check if this feature declares a conflict with `other`.
    fn conflicts_with(&self, other: &str) -> bool {
        self.conflicts().iter().any(|name| *name == other)
    }
}
