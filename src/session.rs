//! Generation sessions.
//!
//! A session drives one generation run through its fixed lifecycle:
//!
//! ```text
//! Created --start--> Started --generate--> Generated --finish--> Ended
//!    \                  \                      \
//!     `------------------`----------------------`--> Failed (on any error)
//! ```
//!
//! Every file written during a phase is reported with one `on_file_closed`
//! event once the phase event completes. Files written before a failure stay
//! on disk.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, error, info};

use crate::config::ConfigRegistry;
use crate::dispatcher::{EventContext, EventDispatcher};
use crate::error::{SessionError, SessionResult};
use crate::event::{Event, EventNames, Phase};
use crate::feature::{Artifact, Feature};
use crate::feature_set::FeatureSet;
use crate::makefile::Makefile;
use crate::services::Services;
use crate::settings::Settings;
use crate::stream::{EventSender, EventStream, SessionEvent, StreamBuilder};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No phase has run yet.
    Created,
    /// `on_start` completed.
    Started,
    /// Every generate event completed.
    Generated,
    /// `on_end` completed.
    Ended,
    /// A phase failed; nothing else can run.
    Failed,
}

impl SessionState {
    /// Lowercase name, as printed by `Display`.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Started => "started",
            SessionState::Generated => "generated",
            SessionState::Ended => "ended",
            SessionState::Failed => "failed",
        }
    }

    /// Whether no further phase can run.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Ended | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Events that completed, in order, including ones dispatched by handlers
    pub events: Vec<String>,
    /// Files closed, in order of their first close
    pub files: Vec<PathBuf>,
}

/// Drives one generation run against one feature set.
pub struct GenerationSession {
    features: FeatureSet,
    settings: Settings,
    services: Services,
    events: EventNames,
    dispatcher: EventDispatcher,
    configs: ConfigRegistry,
    state: SessionState,
    fired: RefCell<HashSet<String>>,
    report: GenerationReport,
    progress: Option<EventSender<SessionEvent>>,
}

impl GenerationSession {
    /// Create a session. Bindings and config factories are materialized here.
    pub fn new(features: FeatureSet, settings: Settings, services: Services) -> Self {
        let events = settings.events();
        let dispatcher = features.dispatcher(&events);
        let configs = features.config_registry();
        Self {
            features,
            settings,
            services,
            events,
            dispatcher,
            configs,
            state: SessionState::Created,
            fired: RefCell::new(HashSet::new()),
            report: GenerationReport::default(),
            progress: None,
        }
    }

    /// Report progress to an existing sender.
    pub fn with_progress(mut self, sender: EventSender<SessionEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Open a progress stream for this session.
    pub fn progress(&mut self) -> EventStream<SessionEvent> {
        let (sender, stream) = StreamBuilder::new().build();
        self.progress = Some(sender);
        stream
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The config registry, for configuring features before `start`.
    pub fn configs(&self) -> &ConfigRegistry {
        &self.configs
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn report(&self) -> &GenerationReport {
        &self.report
    }

    /// Run every phase in order.
    pub fn run(&mut self) -> SessionResult<GenerationReport> {
        self.start()?;
        self.generate()?;
        self.finish()?;
        Ok(self.report.clone())
    }

    /// Fire `on_start`.
    pub fn start(&mut self) -> SessionResult<()> {
        self.require_state(SessionState::Created, "start")?;
        info!(features = ?self.features.names(), "generation started");
        self.fire_phase(Event::new(self.events.on_start(), Phase::Start))?;
        self.state = SessionState::Started;
        Ok(())
    }

    /// Fire one generate event per active feature.
    ///
    /// Features without an artifact go first, then artifact owners, each
    /// group in activation order. An owner's artifact is written once its
    /// event completes.
    pub fn generate(&mut self) -> SessionResult<()> {
        self.require_state(SessionState::Started, "generate")?;

        let (plain, owners): (Vec<Rc<dyn Feature>>, Vec<Rc<dyn Feature>>) = self
            .features
            .features()
            .iter()
            .cloned()
            .partition(|f| f.artifact().is_none());

        for feature in plain.iter().chain(owners.iter()) {
            let name = self.events.on_generate(feature.name());
            let phase = Phase::Generate(feature.name().to_string());
            match feature.artifact() {
                None => {
                    self.fire_phase(Event::new(name, phase))?;
                }
                Some(Artifact::Makefile(path)) => {
                    let mut makefile = Makefile::new();
                    self.fire_phase(Event::new(name.clone(), phase).with_payload(&mut makefile))?;
                    self.write_artifact(&name, &path, &makefile.to_string())?;
                }
            }
        }

        self.state = SessionState::Generated;
        Ok(())
    }

    /// Fire `on_end`.
    pub fn finish(&mut self) -> SessionResult<()> {
        self.require_state(SessionState::Generated, "finish")?;
        self.fire_phase(Event::new(self.events.on_end(), Phase::End))?;
        self.state = SessionState::Ended;
        self.notify(SessionEvent::Finished);
        info!(
            events = self.report.events.len(),
            files = self.report.files.len(),
            "generation finished"
        );
        Ok(())
    }

    /// Dispatch an extension event and close the files its handlers wrote.
    ///
    /// Only allowed between `start` and `finish`. Like the lifecycle events,
    /// each event name fires at most once per session.
    pub fn fire(&mut self, event: Event<'_>) -> SessionResult<usize> {
        if !matches!(self.state, SessionState::Started | SessionState::Generated) {
            return Err(SessionError::InvalidState {
                action: "fire events in",
                state: self.state.as_str(),
            });
        }
        self.fire_phase(event)
    }

    fn fire_phase(&mut self, mut event: Event<'_>) -> SessionResult<usize> {
        let name = event.name().to_string();
        if !self.fired.borrow_mut().insert(name.clone()) {
            return Err(self.abort(&name, SessionError::AlreadyFired(name.clone())));
        }

        self.notify(SessionEvent::PhaseStarted {
            event: name.clone(),
        });
        let (result, written, nested) = {
            let ctx = self.context();
            let result = self.dispatcher.dispatch(&mut event, &ctx);
            (result, ctx.take_written(), ctx.take_dispatched())
        };
        self.report.events.extend(nested);
        let handlers = match result {
            Ok(handlers) => handlers,
            Err(err) => return Err(self.abort(&name, err.into())),
        };

        debug!(event = %name, handlers, "phase completed");
        self.report.events.push(name.clone());
        self.notify(SessionEvent::PhaseCompleted {
            event: name,
            handlers,
        });
        self.close_files(written)?;
        Ok(handlers)
    }

    fn write_artifact(&mut self, event: &str, path: &Path, contents: &str) -> SessionResult<()> {
        match self.services.renderer().write_file(path, contents) {
            Ok(written) => self.close_files(vec![written]),
            Err(err) => Err(self.abort(event, err.into())),
        }
    }

    /// Fire `on_file_closed` for every written file.
    ///
    /// A file written again in a later phase is closed again. Within one
    /// batch, files written by close handlers are closed at most once.
    fn close_files(&mut self, files: Vec<PathBuf>) -> SessionResult<()> {
        let name = self.events.on_file_closed();
        let mut pending: VecDeque<PathBuf> = files.into();
        let mut closed: HashSet<PathBuf> = HashSet::new();

        while let Some(path) = pending.pop_front() {
            if !closed.insert(path.clone()) {
                debug!(path = %path.display(), "file already closed in this batch");
                continue;
            }

            let (result, written, nested) = {
                let ctx = self.context();
                let mut event = Event::new(name.clone(), Phase::FileClosed).with_filename(&path);
                let result = self.dispatcher.dispatch(&mut event, &ctx);
                (result, ctx.take_written(), ctx.take_dispatched())
            };
            self.report.events.extend(nested);
            if let Err(err) = result {
                return Err(self.abort(&name, err.into()));
            }

            info!(path = %path.display(), "file closed");
            if !self.report.files.contains(&path) {
                self.report.files.push(path.clone());
            }
            self.notify(SessionEvent::FileClosed { path });
            pending.extend(written);
        }
        Ok(())
    }

    fn context(&self) -> EventContext<'_> {
        EventContext::new(
            &self.dispatcher,
            &self.configs,
            &self.settings,
            &self.services,
        )
        .with_fired(&self.fired)
    }

    fn require_state(&self, expected: SessionState, action: &'static str) -> SessionResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                action,
                state: self.state.as_str(),
            })
        }
    }

    fn abort(&mut self, event: &str, err: SessionError) -> SessionError {
        error!(event, error = %err, "generation aborted");
        self.state = SessionState::Failed;
        self.notify(SessionEvent::Failed {
            event: event.to_string(),
            message: err.to_string(),
        });
        err
    }

    fn notify(&self, event: SessionEvent) {
        if let Some(progress) = &self.progress {
            progress.notify(event);
        }
    }
}

impl fmt::Debug for GenerationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationSession")
            .field("features", &self.features.names())
            .field("state", &self.state)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::config::{EmptyConfig, FeatureConfig};
    use crate::error::{DispatchError, FeatureError};
    use crate::feature::Binding;
    use crate::makefile::{Script, Target};
    use crate::priority::Priority;
    use crate::registry::CatalogBuilder;

    #[derive(Debug)]
    struct Owner;

    impl Feature for Owner {
        fn name(&self) -> &str {
            "owner"
        }

        fn create_config(&self) -> Box<dyn FeatureConfig> {
            Box::new(EmptyConfig)
        }

        fn bindings(&self, _events: &EventNames) -> Vec<Binding> {
            Vec::new()
        }

        fn artifact(&self) -> Option<Artifact> {
            Some(Artifact::Makefile(PathBuf::from("Makefile")))
        }
    }

    #[derive(Debug)]
    struct Contributor {
        fail_on_end: bool,
    }

    impl Feature for Contributor {
        fn name(&self) -> &str {
            "contributor"
        }

        fn create_config(&self) -> Box<dyn FeatureConfig> {
            Box::new(EmptyConfig)
        }

        fn bindings(&self, events: &EventNames) -> Vec<Binding> {
            let fail_on_end = self.fail_on_end;
            vec![
                Binding::new(events.on_generate("owner"), Priority::DEFAULT, |event, _| {
                    event
                        .makefile()?
                        .add_target(Target::new("hello", Script::new("echo hello")))?;
                    Ok(())
                }),
                Binding::new(events.on_generate("contributor"), Priority::DEFAULT, |_, ctx| {
                    ctx.write_file("notes.txt", "notes\n")?;
                    Ok(())
                }),
                Binding::new(events.on_end(), Priority::DEFAULT, move |_, _| {
                    if fail_on_end {
                        Err(FeatureError::from("end failed"))
                    } else {
                        Ok(())
                    }
                }),
            ]
        }
    }

    /// Counts its `on_start` runs and tries to fire `on_start` again from
    /// `on_end`.
    #[derive(Debug)]
    struct Refire {
        starts: Rc<Cell<u32>>,
    }

    impl Feature for Refire {
        fn name(&self) -> &str {
            "refire"
        }

        fn create_config(&self) -> Box<dyn FeatureConfig> {
            Box::new(EmptyConfig)
        }

        fn bindings(&self, events: &EventNames) -> Vec<Binding> {
            let starts = Rc::clone(&self.starts);
            vec![
                Binding::new(events.on_start(), Priority::DEFAULT, move |_, _| {
                    starts.set(starts.get() + 1);
                    Ok(())
                }),
                Binding::new(events.on_end(), Priority::DEFAULT, |_, ctx| {
                    let mut again = Event::new(ctx.events().on_start(), Phase::Start);
                    ctx.dispatch(&mut again).map(|_| ())
                }),
            ]
        }
    }

    /// Fires an extension event from `on_start`.
    #[derive(Debug)]
    struct Extension;

    impl Feature for Extension {
        fn name(&self) -> &str {
            "extension"
        }

        fn create_config(&self) -> Box<dyn FeatureConfig> {
            Box::new(EmptyConfig)
        }

        fn bindings(&self, events: &EventNames) -> Vec<Binding> {
            vec![Binding::new(events.on_start(), Priority::DEFAULT, |_, ctx| {
                let mut extra = Event::new("t.extra", Phase::Adhoc);
                ctx.dispatch(&mut extra).map(|_| ())
            })]
        }
    }

    /// Writes `notes.txt` on start and rewrites it on end, counting closes.
    #[derive(Debug)]
    struct Rewriter {
        closes: Rc<Cell<u32>>,
    }

    impl Feature for Rewriter {
        fn name(&self) -> &str {
            "rewriter"
        }

        fn create_config(&self) -> Box<dyn FeatureConfig> {
            Box::new(EmptyConfig)
        }

        fn bindings(&self, events: &EventNames) -> Vec<Binding> {
            let closes = Rc::clone(&self.closes);
            vec![
                Binding::new(events.on_start(), Priority::DEFAULT, |_, ctx| {
                    ctx.write_file("notes.txt", "v1\n")?;
                    Ok(())
                }),
                Binding::new(events.on_end(), Priority::DEFAULT, |_, ctx| {
                    ctx.write_file("notes.txt", "v2\n")?;
                    Ok(())
                }),
                Binding::new(events.on_file_closed(), Priority::DEFAULT, move |event, ctx| {
                    if event.filename() == Some(Path::new("notes.txt")) {
                        closes.set(closes.get() + 1);
                        // Rewriting the file being closed must not loop.
                        ctx.write_file("notes.txt", "v2\n")?;
                    }
                    Ok(())
                }),
            ]
        }
    }

    fn session_with<F: Feature + 'static>(dir: &Path, feature: F) -> GenerationSession {
        let name = feature.name().to_string();
        let catalog = CatalogBuilder::new().with(feature).build();
        let features = FeatureSet::build(&catalog, &[name]).unwrap();
        GenerationSession::new(
            features,
            Settings::new(dir).with_namespace("t"),
            Services::system(dir),
        )
    }

    fn session(dir: &Path, fail_on_end: bool) -> GenerationSession {
        let catalog = CatalogBuilder::new()
            .with(Owner)
            .with(Contributor { fail_on_end })
            .build();
        let features = FeatureSet::build(&catalog, &["owner", "contributor"]).unwrap();
        GenerationSession::new(
            features,
            Settings::new(dir).with_namespace("t"),
            Services::system(dir),
        )
    }

    #[test]
    fn test_run_fires_lifecycle_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), false);

        let report = session.run().unwrap();

        assert_eq!(
            report.events,
            vec![
                "t.on_start",
                "t.feature.contributor.on_generate",
                "t.feature.owner.on_generate",
                "t.on_end",
            ]
        );
        assert_eq!(
            report.files,
            vec![PathBuf::from("notes.txt"), PathBuf::from("Makefile")]
        );
        assert_eq!(session.state(), SessionState::Ended);

        let makefile = std::fs::read_to_string(dir.path().join("Makefile")).unwrap();
        assert!(makefile.contains("hello:\n\techo hello\n"));
    }

    #[test]
    fn test_phases_out_of_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), false);

        assert!(matches!(
            session.generate(),
            Err(SessionError::InvalidState { state: "created", .. })
        ));
        session.start().unwrap();
        assert!(matches!(
            session.start(),
            Err(SessionError::InvalidState { state: "started", .. })
        ));
    }

    #[test]
    fn test_failure_is_terminal_and_keeps_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), true);

        let err = session.run().unwrap_err();
        assert!(matches!(err, SessionError::Dispatch(_)));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.state().is_terminal());
        assert!(dir.path().join("Makefile").exists());
        assert!(session.finish().is_err());
    }

    #[test]
    fn test_event_fires_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), false);
        session.start().unwrap();

        session.fire(Event::new("t.custom", Phase::Adhoc)).unwrap();
        let err = session
            .fire(Event::new("t.custom", Phase::Adhoc))
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyFired(ref e) if e == "t.custom"));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_adhoc_fire_requires_started_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), false);
        let err = session.fire(Event::new("t.custom", Phase::Adhoc)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
        assert_eq!(session.state(), SessionState::Created);
    }

    #[test]
    fn test_handler_cannot_refire_phase_event() {
        let dir = tempfile::tempdir().unwrap();
        let starts = Rc::new(Cell::new(0));
        let mut session = session_with(
            dir.path(),
            Refire {
                starts: Rc::clone(&starts),
            },
        );

        let err = session.run().unwrap_err();

        assert_eq!(starts.get(), 1);
        assert_eq!(session.state(), SessionState::Failed);
        match err {
            SessionError::Dispatch(DispatchError::Handler {
                source: FeatureError::Dispatch(inner),
                ..
            }) => {
                assert!(matches!(*inner, DispatchError::AlreadyFired(ref e) if e == "t.on_start"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nested_events_are_reported_and_fire_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with(dir.path(), Extension);

        session.start().unwrap();
        assert_eq!(session.report().events, vec!["t.extra", "t.on_start"]);

        let err = session
            .fire(Event::new("t.extra", Phase::Adhoc))
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyFired(ref e) if e == "t.extra"));
    }

    #[test]
    fn test_rewritten_file_is_closed_again() {
        let dir = tempfile::tempdir().unwrap();
        let closes = Rc::new(Cell::new(0));
        let mut session = session_with(
            dir.path(),
            Rewriter {
                closes: Rc::clone(&closes),
            },
        );

        let report = session.run().unwrap();

        assert_eq!(closes.get(), 2);
        assert_eq!(report.files, vec![PathBuf::from("notes.txt")]);
        let text = std::fs::read_to_string(dir.path().join("notes.txt")).unwrap();
        assert_eq!(text, "v2\n");
    }
}
