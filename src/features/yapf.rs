//! Legacy yapf-only formatting.
//!
//! Kept for projects that enabled it before `format` existed. The two features
//! cannot be active together.

use crate::config::{EmptyConfig, FeatureConfig};
use crate::dispatcher::EventContext;
use crate::error::{FeatureError, FeatureResult};
use crate::event::{Event, EventNames};
use crate::feature::{Binding, Feature};
use crate::features::python::PythonConfig;
use crate::makefile::{Script, Target};
use crate::priority::Priority;

pub const NAME: &str = "yapf";

#[derive(Debug, Clone, Copy, Default)]
pub struct YapfFeature;

impl Feature for YapfFeature {
    fn name(&self) -> &str {
        NAME
    }

    fn conflicts(&self) -> &[&str] {
        &[super::format::NAME]
    }

    fn create_config(&self) -> Box<dyn FeatureConfig> {
        Box::new(EmptyConfig)
    }

    fn bindings(&self, events: &EventNames) -> Vec<Binding> {
        vec![
            Binding::new(
                events.on_generate(super::python::NAME),
                Priority::DEFAULT,
                on_python_generate,
            ),
            Binding::new(
                events.on_generate(super::make::NAME),
                Priority::SUPPORT,
                on_make_generate,
            ),
        ]
    }
}

fn on_python_generate(_event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    ctx.configs()
        .update(super::python::NAME, |python: &mut PythonConfig| -> FeatureResult<()> {
            python.add_dev_requirements(["yapf"]);
            Ok(())
        })
}

fn on_make_generate(event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    let style = ctx
        .settings()
        .project_dir()
        .join(super::format::STYLE_FILE);
    let options = if style.exists() {
        format!("-rip --style={}", style.display())
    } else {
        "-rip".to_string()
    };

    let makefile = event.makefile()?;
    makefile.set("YAPF", "$(PYTHON) -m yapf");
    makefile.set("YAPF_OPTIONS", options);
    makefile
        .add_target(
            Target::new("format", Script::new("$(YAPF) $(YAPF_OPTIONS) . Projectfile"))
                .with_deps(["install-dev"])
                .phony()
                .with_doc("Reformats the codebase (with yapf)."),
        )
        .map_err(FeatureError::from)
}
