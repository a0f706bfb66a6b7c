//! Makefile ownership.
//!
//! The make feature owns the Makefile artifact: its generate event carries the
//! open Makefile, every other feature contributes to it, and the feature
//! finishes it with user overrides and a `help` target.

use std::any::Any;
use std::path::PathBuf;

use crate::config::FeatureConfig;
use crate::dispatcher::EventContext;
use crate::error::FeatureResult;
use crate::event::{Event, EventNames};
use crate::feature::{Artifact, Binding, Feature};
use crate::makefile::{Script, Target};
use crate::priority::Priority;

pub const NAME: &str = "make";

pub const MAKEFILE: &str = "Makefile";

/// Makefile expression resolving `tool` from `PATH`, falling back to its name.
pub fn which(tool: &str) -> String {
    format!("$(shell which {tool} || echo {tool})")
}

#[derive(Debug, Clone, Default)]
pub struct MakeConfig {
    overrides: Vec<(String, String)>,
}

impl MakeConfig {
    /// Force a variable value, applied after every other contribution.
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.overrides.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.overrides.push((key, value)),
        }
    }

    pub fn overrides(&self) -> &[(String, String)] {
        &self.overrides
    }
}

impl FeatureConfig for MakeConfig {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MakeFeature;

impl Feature for MakeFeature {
    fn name(&self) -> &str {
        NAME
    }

    fn create_config(&self) -> Box<dyn FeatureConfig> {
        Box::new(MakeConfig::default())
    }

    fn bindings(&self, events: &EventNames) -> Vec<Binding> {
        vec![Binding::new(
            events.on_generate(NAME),
            Priority::LAST,
            on_generate,
        )]
    }

    fn artifact(&self) -> Option<Artifact> {
        Some(Artifact::Makefile(PathBuf::from(MAKEFILE)))
    }
}

fn on_generate(event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    let overrides = ctx
        .configs()
        .read(NAME, |config: &MakeConfig| config.overrides().to_vec())?;

    let makefile = event.makefile()?;
    for (key, value) in overrides {
        makefile.set(key, value);
    }

    let mut help = Script::default();
    help.push("@echo \"Available commands:\"");
    help.push("@echo");
    for target in makefile.targets() {
        if let Some(doc) = target.doc() {
            help.push(format!("@echo \"  {:<16} {}\"", target.name(), doc));
        }
    }
    makefile.add_target(
        Target::new("help", help)
            .phony()
            .with_doc("Shows available commands."),
    )?;
    Ok(())
}
