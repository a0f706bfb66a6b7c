//! Python packaging.
//!
//! Other features add their requirements through `PythonConfig` while the
//! python generate event runs; the feature writes the requirement files last.

use std::any::Any;
use std::collections::BTreeSet;

use crate::config::FeatureConfig;
use crate::dispatcher::EventContext;
use crate::error::FeatureResult;
use crate::event::{Event, EventNames};
use crate::feature::{Binding, Feature};
use crate::makefile::{Script, Target};
use crate::priority::Priority;

pub const NAME: &str = "python";

pub const REQUIREMENTS: &str = "requirements.txt";
pub const DEV_REQUIREMENTS: &str = "requirements-dev.txt";

#[derive(Debug, Clone, Default)]
pub struct PythonConfig {
    requirements: BTreeSet<String>,
    dev_requirements: BTreeSet<String>,
}

impl PythonConfig {
    /// Add runtime and development requirements.
    pub fn add_requirements<P, D>(&mut self, prod: P, dev: D)
    where
        P: IntoIterator,
        P::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        self.requirements.extend(prod.into_iter().map(Into::into));
        self.dev_requirements.extend(dev.into_iter().map(Into::into));
    }

    /// Add development requirements only.
    pub fn add_dev_requirements<D>(&mut self, dev: D)
    where
        D: IntoIterator,
        D::Item: Into<String>,
    {
        self.add_requirements(std::iter::empty::<String>(), dev);
    }

    pub fn requirements(&self) -> &BTreeSet<String> {
        &self.requirements
    }

    pub fn dev_requirements(&self) -> &BTreeSet<String> {
        &self.dev_requirements
    }
}

impl FeatureConfig for PythonConfig {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonFeature;

impl Feature for PythonFeature {
    fn name(&self) -> &str {
        NAME
    }

    fn create_config(&self) -> Box<dyn FeatureConfig> {
        Box::new(PythonConfig::default())
    }

    fn bindings(&self, events: &EventNames) -> Vec<Binding> {
        vec![
            Binding::new(events.on_generate(NAME), Priority::LAST, on_generate),
            Binding::new(
                events.on_generate(super::make::NAME),
                Priority::HIGH,
                on_make_generate,
            ),
        ]
    }
}

fn on_generate(_event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    let (prod, dev) = ctx.configs().read(NAME, |config: &PythonConfig| {
        (requirement_lines(config.requirements()), {
            let mut lines = format!("-r {REQUIREMENTS}\n");
            lines.push_str(&requirement_lines(config.dev_requirements()));
            lines
        })
    })?;
    ctx.write_file(REQUIREMENTS, &prod)?;
    ctx.write_file(DEV_REQUIREMENTS, &dev)?;
    Ok(())
}

fn requirement_lines(requirements: &BTreeSet<String>) -> String {
    requirements.iter().map(|r| format!("{r}\n")).collect()
}

fn on_make_generate(event: &mut Event<'_>, _ctx: &EventContext<'_>) -> FeatureResult<()> {
    let makefile = event.makefile()?;
    makefile.set("PYTHON", "$(shell which python3 || which python)");
    makefile.set("PIP", "$(PYTHON) -m pip");
    makefile.add_target(
        Target::new("install", Script::new(format!("$(PIP) install -r {REQUIREMENTS}")))
            .with_deps([REQUIREMENTS])
            .phony()
            .with_doc("Installs the project."),
    )?;
    makefile.add_target(
        Target::new(
            "install-dev",
            Script::new(format!("$(PIP) install -r {DEV_REQUIREMENTS}")),
        )
        .with_deps([DEV_REQUIREMENTS])
        .phony()
        .with_doc("Installs the project (with dev dependencies)."),
    )?;
    Ok(())
}
