//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits
//! from Featurekit for convenient glob imports.
//!
//! # Example
//!
//! ```rust
//! use featurekit::prelude::*;
//! ```

// Configuration
pub use crate::config::{ConfigRegistry, EmptyConfig, FeatureConfig};
pub use crate::settings::{Settings, Variables};

// Features and events
pub use crate::dispatcher::{EventContext, EventDispatcher};
pub use crate::event::{Event, EventNames, Phase};
pub use crate::feature::{handler, Artifact, Binding, Feature};
pub use crate::makefile::{Makefile, Script, Target};
pub use crate::priority::Priority;

// Catalog and sessions
pub use crate::feature_set::FeatureSet;
pub use crate::registry::{CatalogBuilder, FeatureCatalog};
pub use crate::services::{CommandOutput, CommandRunner, Services};
pub use crate::session::{GenerationReport, GenerationSession, SessionState};

// Builtin feature configs
pub use crate::features::{FormatConfig, GitConfig, MakeConfig, PythonConfig};

// Streams
pub use crate::stream::{create_stream, EventSender, EventStream, SessionEvent, StreamBuilder};

// Errors
pub use crate::error::{
    ConfigError, ConflictError, DispatchError, FeatureError, FeatureResult, FeaturekitError,
    FeaturekitResult, SessionError,
};
