//! Priority-ordered event dispatch.
//!
//! The dispatcher is an ordered multimap from event name to handlers. Handlers
//! for one event run in ascending priority, ties in registration order. The
//! first failing handler stops the dispatch and its error is returned.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::config::ConfigRegistry;
use crate::error::{DispatchError, DispatchResult, FeatureError, FeatureResult};
use crate::event::{Event, EventNames};
use crate::feature::{self, Binding, Handler};
use crate::priority::Priority;
use crate::services::{CommandOutput, Services};
use crate::settings::{Settings, Variables};

/// Feature label for handlers subscribed without an owner.
pub const ANONYMOUS: &str = "<anonymous>";

struct Subscription {
    feature: String,
    priority: Priority,
    handler: Handler,
}

/// Ordered multimap from event name to handlers.
#[derive(Default)]
pub struct EventDispatcher {
    subscriptions: HashMap<String, Vec<Subscription>>,
    dispatching: RefCell<Vec<String>>,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe an anonymous handler.
    pub fn subscribe<F>(&mut self, event: impl Into<String>, handler: F, priority: Priority)
    where
        F: Fn(&mut Event<'_>, &EventContext<'_>) -> FeatureResult<()> + 'static,
    {
        self.subscribe_as(ANONYMOUS, event, feature::handler(handler), priority);
    }

    /// Subscribe a handler owned by `feature`.
    pub fn subscribe_as(
        &mut self,
        feature: impl Into<String>,
        event: impl Into<String>,
        handler: Handler,
        priority: Priority,
    ) {
        let event = event.into();
        let feature = feature.into();
        trace!(event = %event, feature = %feature, %priority, "subscribing handler");

        let handlers = self.subscriptions.entry(event).or_default();
        let index = handlers.partition_point(|s| s.priority <= priority);
        handlers.insert(
            index,
            Subscription {
                feature,
                priority,
                handler,
            },
        );
    }

    /// Subscribe a feature's declared binding.
    pub fn subscribe_binding(&mut self, feature: &str, binding: &Binding) {
        self.subscribe_as(
            feature,
            binding.event(),
            Rc::clone(binding.handler()),
            binding.priority(),
        );
    }

    /// Resolved (feature, priority) order for an event.
    pub fn plan(&self, event: &str) -> Vec<(&str, Priority)> {
        self.subscriptions
            .get(event)
            .map(|handlers| {
                handlers
                    .iter()
                    .map(|s| (s.feature.as_str(), s.priority))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of all events with at least one handler, sorted.
    pub fn events(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.subscriptions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of handlers subscribed to `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.subscriptions.get(event).map_or(0, Vec::len)
    }

    /// Check whether `event` is currently being dispatched.
    pub fn is_dispatching(&self, event: &str) -> bool {
        self.dispatching.borrow().iter().any(|name| name == event)
    }

    /// Invoke every handler of `event.name()` in priority order.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &mut Event<'_>, ctx: &EventContext<'_>) -> DispatchResult<usize> {
        let name = event.name().to_string();
        if self.is_dispatching(&name) {
            return Err(DispatchError::Reentrant(name));
        }
        self.dispatching.borrow_mut().push(name.clone());
        let _guard = DispatchGuard {
            stack: &self.dispatching,
        };

        let Some(handlers) = self.subscriptions.get(&name) else {
            trace!(event = %name, "no handlers subscribed");
            return Ok(0);
        };

        debug!(event = %name, phase = %event.phase(), handlers = handlers.len(), "dispatching");
        for subscription in handlers {
            trace!(
                event = %name,
                feature = %subscription.feature,
                priority = %subscription.priority,
                "invoking handler"
            );
            if let Err(source) = (subscription.handler)(event, ctx) {
                warn!(event = %name, feature = %subscription.feature, error = %source, "handler failed");
                return Err(DispatchError::Handler {
                    event: name,
                    feature: subscription.feature.clone(),
                    source,
                });
            }
        }
        Ok(handlers.len())
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for event in self.events() {
            map.entry(&event, &self.plan(event));
        }
        map.finish()
    }
}

struct DispatchGuard<'d> {
    stack: &'d RefCell<Vec<String>>,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

/// Everything a handler can reach besides the event itself.
pub struct EventContext<'s> {
    dispatcher: &'s EventDispatcher,
    configs: &'s ConfigRegistry,
    settings: &'s Settings,
    services: &'s Services,
    fired: Option<&'s RefCell<HashSet<String>>>,
    written: RefCell<Vec<PathBuf>>,
    dispatched: RefCell<Vec<String>>,
}

impl<'s> EventContext<'s> {
    /// Create a context with no fire-once tracking.
    pub fn new(
        dispatcher: &'s EventDispatcher,
        configs: &'s ConfigRegistry,
        settings: &'s Settings,
        services: &'s Services,
    ) -> Self {
        Self {
            dispatcher,
            configs,
            settings,
            services,
            fired: None,
            written: RefCell::new(Vec::new()),
            dispatched: RefCell::new(Vec::new()),
        }
    }

    /// Track fired event names in `fired`.
    ///
    /// Nested dispatches then refuse any event already in the set, except
    /// `on_file_closed`.
    pub fn with_fired(mut self, fired: &'s RefCell<HashSet<String>>) -> Self {
        self.fired = Some(fired);
        self
    }

    pub fn configs(&self) -> &'s ConfigRegistry {
        self.configs
    }

    pub fn settings(&self) -> &'s Settings {
        self.settings
    }

    pub fn services(&self) -> &'s Services {
        self.services
    }

    /// Event names under the session namespace.
    pub fn events(&self) -> EventNames {
        self.settings.events()
    }

    /// Run a command in the project directory, failing on non-zero exit.
    pub fn run(&self, argv: &[&str]) -> FeatureResult<CommandOutput> {
        self.services
            .runner()
            .run(argv, self.settings.project_dir())?
            .checked(argv)
    }

    /// Render a named template and record the file as written.
    pub fn render_file(
        &self,
        path: impl AsRef<Path>,
        template: &str,
        vars: &Variables,
    ) -> FeatureResult<PathBuf> {
        let written = self
            .services
            .renderer()
            .render_file(path.as_ref(), template, vars)?;
        Ok(self.record(written))
    }

    /// Render an inline template and record the file as written.
    pub fn render_file_inline(
        &self,
        path: impl AsRef<Path>,
        raw: &str,
        vars: &Variables,
    ) -> FeatureResult<PathBuf> {
        let written = self
            .services
            .renderer()
            .render_file_inline(path.as_ref(), raw, vars)?;
        Ok(self.record(written))
    }

    /// Write raw contents and record the file as written.
    pub fn write_file(&self, path: impl AsRef<Path>, contents: &str) -> FeatureResult<PathBuf> {
        let written = self
            .services
            .renderer()
            .write_file(path.as_ref(), contents)?;
        Ok(self.record(written))
    }

    /// Dispatch another event from inside a handler.
    ///
    /// Dispatching the event currently being handled fails, and so does an
    /// event that already fired when fire-once tracking is on.
    pub fn dispatch(&self, event: &mut Event<'_>) -> FeatureResult<usize> {
        let name = event.name().to_string();
        if let Some(fired) = self.fired {
            if name != self.events().on_file_closed() && !fired.borrow_mut().insert(name.clone()) {
                return Err(FeatureError::Dispatch(Box::new(DispatchError::AlreadyFired(
                    name,
                ))));
            }
        }
        let handlers = self
            .dispatcher
            .dispatch(event, self)
            .map_err(|err| FeatureError::Dispatch(Box::new(err)))?;
        self.dispatched.borrow_mut().push(name);
        Ok(handlers)
    }

    /// Files written through this context since the last call.
    pub fn take_written(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.written.borrow_mut())
    }

    /// Events dispatched through this context that completed, in order.
    pub fn take_dispatched(&self) -> Vec<String> {
        std::mem::take(&mut *self.dispatched.borrow_mut())
    }

    fn record(&self, path: PathBuf) -> PathBuf {
        self.written.borrow_mut().push(path.clone());
        path
    }
}

impl fmt::Debug for EventContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("settings", self.settings)
            .field("written", &self.written.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Phase;
    use crate::feature::handler;

    fn push(label: &'static str) -> impl Fn(&mut Event<'_>, &EventContext<'_>) -> FeatureResult<()> {
        move |event, _| {
            event.payload_mut::<Vec<String>>()?.push(label.to_string());
            Ok(())
        }
    }

    fn run(dispatcher: &EventDispatcher, name: &str) -> (DispatchResult<usize>, Vec<String>) {
        let configs = ConfigRegistry::new();
        let settings = Settings::default();
        let services = Services::system(".");
        let ctx = EventContext::new(dispatcher, &configs, &settings, &services);

        let mut seen: Vec<String> = Vec::new();
        let result = {
            let mut event = Event::new(name, Phase::Adhoc).with_payload(&mut seen);
            dispatcher.dispatch(&mut event, &ctx)
        };
        (result, seen)
    }

    #[test]
    fn test_ascending_priority() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe("gen", push("a"), Priority::new(10));
        dispatcher.subscribe("gen", push("b"), Priority::new(5));

        let (result, seen) = run(&dispatcher, "gen");
        assert_eq!(result.unwrap(), 2);
        assert_eq!(seen, vec!["b", "a"]);
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe("gen", push("first"), Priority::DEFAULT);
        dispatcher.subscribe("gen", push("early"), Priority::ABSOLUTE);
        dispatcher.subscribe("gen", push("second"), Priority::DEFAULT);
        dispatcher.subscribe("gen", push("bootstrap"), Priority::ABSOLUTE.before());
        dispatcher.subscribe("gen", push("third"), Priority::DEFAULT);

        let (_, seen) = run(&dispatcher, "gen");
        assert_eq!(seen, vec!["bootstrap", "early", "first", "second", "third"]);
    }

    #[test]
    fn test_unknown_event_is_a_no_op() {
        let dispatcher = EventDispatcher::new();
        let (result, seen) = run(&dispatcher, "nothing");
        assert_eq!(result.unwrap(), 0);
        assert!(seen.is_empty());
    }

    #[test]
    fn test_failure_halts_dispatch() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe("gen", push("before"), Priority::new(1));
        dispatcher.subscribe_as(
            "broken",
            "gen",
            handler(|_, _| Err(FeatureError::from("boom"))),
            Priority::new(2),
        );
        dispatcher.subscribe("gen", push("after"), Priority::new(3));

        let (result, seen) = run(&dispatcher, "gen");
        let err = result.unwrap_err();
        assert_eq!(err.event(), "gen");
        assert_eq!(err.feature(), Some("broken"));
        assert_eq!(seen, vec!["before"]);
        assert!(!dispatcher.is_dispatching("gen"));
    }

    #[test]
    fn test_reentrant_dispatch_fails() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(
            "gen",
            |_, ctx| {
                let mut again = Event::new("gen", Phase::Adhoc);
                ctx.dispatch(&mut again).map(|_| ())
            },
            Priority::DEFAULT,
        );

        let (result, _) = run(&dispatcher, "gen");
        match result.unwrap_err() {
            DispatchError::Handler { source, .. } => match source {
                FeatureError::Dispatch(inner) => {
                    assert!(matches!(*inner, DispatchError::Reentrant(ref e) if e == "gen"));
                }
                other => panic!("unexpected source: {other:?}"),
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nested_dispatch_of_other_event() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(
            "outer",
            |_, ctx| {
                let mut lines: Vec<String> = Vec::new();
                let mut inner = Event::new("inner", Phase::Adhoc).with_payload(&mut lines);
                ctx.dispatch(&mut inner)?;
                drop(inner);
                if lines == ["inner"] {
                    Ok(())
                } else {
                    Err(FeatureError::from("inner handler did not run"))
                }
            },
            Priority::DEFAULT,
        );
        dispatcher.subscribe("inner", push("inner"), Priority::DEFAULT);

        let (result, _) = run(&dispatcher, "outer");
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_plan() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe_as("git", "gen", handler(|_, _| Ok(())), Priority::LAST);
        dispatcher.subscribe_as("format", "gen", handler(|_, _| Ok(())), Priority::SUPPORT);

        assert_eq!(
            dispatcher.plan("gen"),
            vec![("format", Priority::SUPPORT), ("git", Priority::LAST)]
        );
        assert_eq!(dispatcher.handler_count("gen"), 2);
        assert_eq!(dispatcher.events(), vec!["gen"]);
        assert!(dispatcher.plan("other").is_empty());
    }
}
