//! # Featurekit
//!
//! **Featurekit** generates a project's build configuration (Makefile, requirement
//! files, ignore files, tool configs) from a set of independently authored
//! features that cooperate through a prioritized event bus.
//!
//! ## Overview
//!
//! Each feature contributes:
//! - **A typed config**: created lazily, shared by every handler in the run
//! - **Event bindings**: handlers subscribed at a priority on named events
//! - **Conflicts**: features it cannot be activated together with
//! - **An artifact** (optional): a file it owns and hands to its generate event
//!
//! ## Lifecycle
//!
//! ```text
//! <ns>.on_start
//! <ns>.feature.<feature>.on_generate   (once per active feature)
//! <ns>.on_file_closed                  (once per written file)
//! <ns>.on_end
//! ```
//!
//! Handlers for one event run in ascending priority order; ties keep
//! registration order. The first failing handler stops the event and the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use featurekit::prelude::*;
//!
//! let catalog = FeatureCatalog::with_builtins();
//! let features = FeatureSet::build(&catalog, &["make", "git", "python", "format"])?;
//!
//! let settings = Settings::new("my-project");
//! let services = Services::system(settings.project_dir());
//! let mut session = GenerationSession::new(features, settings, services);
//!
//! session
//!     .configs()
//!     .update("format", |format: &mut FormatConfig| format.using(["black", "isort"]))?;
//!
//! let report = session.run()?;
//! println!("wrote {} files", report.files.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod dispatcher;
mod error;
mod event;
mod feature;
mod feature_set;
mod makefile;
mod priority;
mod registry;
mod render;
mod services;
mod session;
mod settings;

pub mod features;
pub mod stream;

pub mod prelude;

// Re-export core types
pub use config::{ConfigFactory, ConfigRegistry, EmptyConfig, FeatureConfig, SharedConfig};
pub use dispatcher::{EventContext, EventDispatcher};
pub use error::{
    ConfigError, ConfigResult, ConflictError, DispatchError, DispatchResult, FeatureError,
    FeatureResult, FeatureSetError, FeatureSetResult, FeaturekitError, FeaturekitResult,
    RegistryError, RegistryResult, SessionError, SessionResult,
};
pub use event::{Event, EventNames, Phase, DEFAULT_NAMESPACE};
pub use feature::{handler, Artifact, Binding, Feature, Handler};
pub use feature_set::FeatureSet;
pub use makefile::{Makefile, Script, Target};
pub use priority::Priority;
pub use registry::{CatalogBuilder, FeatureCatalog};
pub use render::{FsRenderer, Renderer, Templates};
pub use services::{CommandOutput, CommandRunner, Services, SystemRunner};
pub use session::{GenerationReport, GenerationSession, SessionState};
pub use settings::{Settings, Variables};
pub use stream::{create_stream, EventSender, EventStream, SessionEvent, StreamBuilder};
