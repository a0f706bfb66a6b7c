//! Error types for Featurekit.

use thiserror::Error;

/// Root error type for Featurekit operations.
#[derive(Error, Debug)]
pub enum FeaturekitError {
    /// Catalog-related errors
    #[error("Catalog error: {0}")]
    Registry(#[from] RegistryError),

    /// Feature set construction errors
    #[error("Feature set error: {0}")]
    FeatureSet(#[from] FeatureSetError),

    /// Configuration errors raised outside of a dispatch
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generation session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Errors raised by the configuration registry and feature config mutators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A mutator received a value outside its recognized set
    #[error("Invalid option for feature \"{feature}\": {option}")]
    InvalidOption { feature: String, option: String },

    /// No active feature declares a config under this name
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// The config exists but is not of the requested type
    #[error("Config for feature \"{feature}\" is not a {expected}")]
    TypeMismatch {
        feature: String,
        expected: &'static str,
    },

    /// The config is already mutably borrowed further up the call stack
    #[error("Config for feature \"{0}\" is already borrowed")]
    Borrowed(String),
}

/// Contradictory contributions that must abort generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// Two active features declare a conflict with each other
    #[error("Features \"{first}\" and \"{second}\" conflict and cannot be active together")]
    Features { first: String, second: String },

    /// Two mutually exclusive options are active within one feature
    #[error("Feature \"{feature}\": using both \"{first}\" and \"{second}\" does not make sense, choose one")]
    Options {
        feature: String,
        first: String,
        second: String,
    },

    /// Two contributions registered the same artifact target
    #[error("Target \"{0}\" is already defined")]
    Target(String),
}

/// Errors a feature handler may return.
#[derive(Error, Debug)]
pub enum FeatureError {
    /// Config lookup or mutation failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Contradictory contributions detected mid-generation
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// IO error from a render or artifact collaborator
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An external command exited unsuccessfully
    #[error("Command `{command}` failed (exit {code}): {stderr}")]
    Command {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The event payload is missing or of an unexpected type
    #[error("Event \"{event}\" does not carry a {expected} payload")]
    Payload {
        event: String,
        expected: &'static str,
    },

    /// A nested dispatch issued from inside a handler failed
    #[error(transparent)]
    Dispatch(#[from] Box<DispatchError>),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<String> for FeatureError {
    fn from(msg: String) -> Self {
        FeatureError::Other(msg)
    }
}

impl From<&str> for FeatureError {
    fn from(msg: &str) -> Self {
        FeatureError::Other(msg.to_string())
    }
}

/// Errors produced while dispatching an event.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A handler failed; remaining handlers for the event did not run
    #[error("Handler of feature \"{feature}\" failed on \"{event}\": {source}")]
    Handler {
        event: String,
        feature: String,
        #[source]
        source: FeatureError,
    },

    /// A handler tried to dispatch the event that is currently dispatching
    #[error("Re-entrant dispatch of \"{0}\"")]
    Reentrant(String),

    /// A handler tried to dispatch an event that already fired this session
    #[error("Event \"{0}\" already fired in this session")]
    AlreadyFired(String),
}

impl DispatchError {
    /// Name of the event whose dispatch failed.
    pub fn event(&self) -> &str {
        match self {
            DispatchError::Handler { event, .. } => event,
            DispatchError::Reentrant(event) | DispatchError::AlreadyFired(event) => event,
        }
    }

    /// Feature owning the failed handler, if a handler failed.
    pub fn feature(&self) -> Option<&str> {
        match self {
            DispatchError::Handler { feature, .. } => Some(feature),
            DispatchError::Reentrant(_) | DispatchError::AlreadyFired(_) => None,
        }
    }
}

/// Errors that can occur in catalog operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Feature already registered with this name
    #[error("Feature already registered: {0}")]
    AlreadyRegistered(String),

    /// Invalid feature name
    #[error("Invalid feature name: {0}")]
    InvalidName(String),
}

/// Errors raised while building a feature set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureSetError {
    /// A requested name does not resolve to a known feature
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Two requested features conflict
    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

/// Errors raised by a generation session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A phase was requested out of lifecycle order
    #[error("Cannot {action} a session in state {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    /// The event already fired in this session
    #[error("Event \"{0}\" already fired in this session")]
    AlreadyFired(String),

    /// Dispatch of a phase event failed
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Writing an artifact failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for feature handlers.
pub type FeatureResult<T> = Result<T, FeatureError>;

/// Result type alias for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type alias for catalog operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for feature set construction.
pub type FeatureSetResult<T> = Result<T, FeatureSetError>;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type alias for general Featurekit operations.
pub type FeaturekitResult<T> = Result<T, FeaturekitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_error_names_both_features() {
        let error = ConflictError::Features {
            first: "a".to_string(),
            second: "b".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("\"a\""));
        assert!(msg.contains("\"b\""));
    }

    #[test]
    fn test_dispatch_error_accessors() {
        let error = DispatchError::Handler {
            event: "gen".to_string(),
            feature: "format".to_string(),
            source: FeatureError::from("boom"),
        };
        assert_eq!(error.event(), "gen");
        assert_eq!(error.feature(), Some("format"));
        assert!(std::error::Error::source(&error).is_some());

        let error = DispatchError::Reentrant("gen".to_string());
        assert_eq!(error.event(), "gen");
        assert_eq!(error.feature(), None);
    }
}
