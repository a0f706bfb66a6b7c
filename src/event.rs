//! Events and the event-name wire contract.

use std::any::{type_name, Any};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{FeatureError, FeatureResult};
use crate::makefile::Makefile;

/// Default event namespace.
pub const DEFAULT_NAMESPACE: &str = "featurekit";

/// Builds the stable event names features subscribe to.
///
/// ```rust
/// use featurekit::EventNames;
///
/// let names = EventNames::new("acme");
/// assert_eq!(names.on_start(), "acme.on_start");
/// assert_eq!(names.on_generate("make"), "acme.feature.make.on_generate");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames {
    namespace: String,
}

impl EventNames {
    /// Create event names under the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// The namespace prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `<ns>.on_start`
    pub fn on_start(&self) -> String {
        format!("{}.on_start", self.namespace)
    }

    /// `<ns>.feature.<feature>.on_generate`
    pub fn on_generate(&self, feature: &str) -> String {
        format!("{}.feature.{}.on_generate", self.namespace, feature)
    }

    /// `<ns>.on_file_closed`
    pub fn on_file_closed(&self) -> String {
        format!("{}.on_file_closed", self.namespace)
    }

    /// `<ns>.on_end`
    pub fn on_end(&self) -> String {
        format!("{}.on_end", self.namespace)
    }
}

impl Default for EventNames {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// Generation phase that produced an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Session start
    Start,
    /// Domain generation for the named feature
    Generate(String),
    /// A file was finalized
    FileClosed,
    /// Session end
    End,
    /// Dispatched outside of a session lifecycle
    Adhoc,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => f.write_str("start"),
            Phase::Generate(feature) => write!(f, "generate({feature})"),
            Phase::FileClosed => f.write_str("file-closed"),
            Phase::End => f.write_str("end"),
            Phase::Adhoc => f.write_str("adhoc"),
        }
    }
}

/// A transient value handed to every handler of one dispatch.
///
/// The payload is borrowed mutably for the duration of the dispatch, so each
/// handler observes what earlier handlers wrote.
pub struct Event<'a> {
    name: String,
    phase: Phase,
    payload: Option<&'a mut dyn Any>,
    filename: Option<PathBuf>,
}

impl<'a> Event<'a> {
    /// Create an event without payload.
    pub fn new(name: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            phase,
            payload: None,
            filename: None,
        }
    }

    /// Attach a mutable payload.
    pub fn with_payload<T: Any>(mut self, payload: &'a mut T) -> Self {
        let payload: &'a mut dyn Any = payload;
        self.payload = Some(payload);
        self
    }

    /// Attach the name of the file this event is about.
    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Phase that produced this event.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// File name carried by file events.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Whether the event carries a payload.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Borrow the payload as `T`.
    pub fn payload_mut<T: Any>(&mut self) -> FeatureResult<&mut T> {
        let name = &self.name;
        self.payload
            .as_deref_mut()
            .and_then(|payload| payload.downcast_mut::<T>())
            .ok_or_else(|| FeatureError::Payload {
                event: name.clone(),
                expected: type_name::<T>(),
            })
    }

    /// Borrow the Makefile under construction.
    pub fn makefile(&mut self) -> FeatureResult<&mut Makefile> {
        self.payload_mut::<Makefile>()
    }
}

impl fmt::Debug for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("has_payload", &self.payload.is_some())
            .field("filename", &self.filename)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let names = EventNames::default();
        assert_eq!(names.on_start(), "featurekit.on_start");
        assert_eq!(names.on_file_closed(), "featurekit.on_file_closed");
        assert_eq!(names.on_end(), "featurekit.on_end");
        assert_eq!(
            names.on_generate("python"),
            "featurekit.feature.python.on_generate"
        );
    }

    #[test]
    fn test_payload_downcast() {
        let mut lines: Vec<String> = Vec::new();
        let mut event = Event::new("gen", Phase::Adhoc).with_payload(&mut lines);

        event.payload_mut::<Vec<String>>().unwrap().push("x".into());
        assert!(event.payload_mut::<Makefile>().is_err());
        drop(event);

        assert_eq!(lines, vec!["x".to_string()]);
    }

    #[test]
    fn test_missing_payload() {
        let mut event = Event::new("gen", Phase::Start);
        assert!(!event.has_payload());
        let err = event.makefile().unwrap_err();
        assert!(matches!(err, FeatureError::Payload { .. }));
    }
}
