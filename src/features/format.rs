//! Code formatting with third party tools.
//!
//! Supersedes the single-tool `yapf` feature, which it conflicts with.
//! Active tools are chosen with `FormatConfig::using`; the feature then
//! contributes their dev requirements and a `make format` target.

use std::any::Any;
use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::info;

use crate::config::FeatureConfig;
use crate::dispatcher::EventContext;
use crate::error::{ConfigError, ConfigResult, ConflictError, FeatureError, FeatureResult};
use crate::event::{Event, EventNames};
use crate::feature::{Binding, Feature};
use crate::features::make::which;
use crate::features::python::PythonConfig;
use crate::makefile::{Script, Target};
use crate::priority::Priority;
use crate::settings::Variables;

pub const NAME: &str = "format";

pub const PYTHON_TOOLS: &[&str] = &["black", "isort", "yapf"];
pub const JAVASCRIPT_TOOLS: &[&str] = &["prettier"];

pub const STYLE_FILE: &str = ".style.yapf";
const STYLE_TEMPLATE: &str = "yapf/style.yapf.j2";
const LINE_LENGTH: &str = "120";

#[derive(Debug, Clone, Default)]
pub struct FormatConfig {
    active_tools: BTreeSet<String>,
    style_config: Option<PathBuf>,
}

impl FormatConfig {
    /// Activate formatting tools.
    ///
    /// Fails without activating anything if one of the names is unknown.
    pub fn using<I, S>(&mut self, tools: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tools: Vec<String> = tools.into_iter().map(|t| t.as_ref().to_string()).collect();
        if let Some(unknown) = tools.iter().find(|t| !is_known_tool(t)) {
            return Err(ConfigError::InvalidOption {
                feature: NAME.to_string(),
                option: format!("unknown formatting tool \"{unknown}\""),
            });
        }
        self.active_tools.extend(tools);
        Ok(())
    }

    pub fn is_active(&self, tool: &str) -> bool {
        self.active_tools.contains(tool)
    }

    /// Active tools, sorted.
    pub fn active_tools(&self) -> &BTreeSet<String> {
        &self.active_tools
    }

    /// Yapf style file in use, if any.
    pub fn style_config(&self) -> Option<&PathBuf> {
        self.style_config.as_ref()
    }

    /// Fail if two mutually exclusive tools are active.
    pub fn check_exclusive(&self) -> Result<(), ConflictError> {
        if self.is_active("black") && self.is_active("yapf") {
            return Err(ConflictError::Options {
                feature: NAME.to_string(),
                first: "black".to_string(),
                second: "yapf".to_string(),
            });
        }
        Ok(())
    }
}

fn is_known_tool(tool: &str) -> bool {
    PYTHON_TOOLS.contains(&tool) || JAVASCRIPT_TOOLS.contains(&tool)
}

impl FeatureConfig for FormatConfig {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatFeature;

impl Feature for FormatFeature {
    fn name(&self) -> &str {
        NAME
    }

    fn conflicts(&self) -> &[&str] {
        &[super::yapf::NAME]
    }

    fn create_config(&self) -> Box<dyn FeatureConfig> {
        Box::new(FormatConfig::default())
    }

    fn bindings(&self, events: &EventNames) -> Vec<Binding> {
        vec![
            Binding::new(events.on_start(), Priority::ABSOLUTE.before(), on_before_start),
            Binding::new(events.on_start(), Priority::SUPPORT, on_start),
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

fn on_before_start(_event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    let settings = ctx.settings();
    let detected = settings.project_dir().join(STYLE_FILE);
    let style_config = match settings.yapf_style_config() {
        Some(explicit) => Some(explicit.to_path_buf()),
        None if detected.exists() => Some(detected),
        None => None,
    };

    if let Some(path) = style_config {
        info!(path = %path.display(), "using yapf style config");
        ctx.configs()
            .update(NAME, |config: &mut FormatConfig| -> ConfigResult<()> {
                config.style_config = Some(path);
                Ok(())
            })?;
    }
    Ok(())
}

/// Render `.style.yapf` only when yapf is active, since no other tool reads it.
fn on_start(_event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    let needs_style = ctx.configs().read(NAME, |config: &FormatConfig| {
        config.is_active("yapf") && config.style_config().is_none()
    })?;
    if !needs_style {
        return Ok(());
    }

    let mut vars: Variables = ctx.settings().variables().clone();
    vars.entry("line_length".to_string())
        .or_insert_with(|| LINE_LENGTH.to_string());
    let written = ctx.render_file(STYLE_FILE, STYLE_TEMPLATE, &vars)?;
    let path = ctx.settings().project_dir().join(written);
    ctx.configs()
        .update(NAME, |config: &mut FormatConfig| -> ConfigResult<()> {
            config.style_config = Some(path);
            Ok(())
        })?;
    Ok(())
}

fn on_python_generate(_event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    // black is left for the user to install.
    let tools: Vec<String> = ctx.configs().read(NAME, |config: &FormatConfig| {
        PYTHON_TOOLS
            .iter()
            .filter(|tool| **tool != "black" && config.is_active(tool))
            .map(|tool| tool.to_string())
            .collect()
    })?;
    if tools.is_empty() {
        return Ok(());
    }

    ctx.configs()
        .update(super::python::NAME, |python: &mut PythonConfig| -> FeatureResult<()> {
            python.add_dev_requirements(tools);
            Ok(())
        })
}

fn on_make_generate(event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    let config = ctx
        .configs()
        .read(NAME, |config: &FormatConfig| config.clone())?;
    config.check_exclusive()?;
    if config.active_tools().is_empty() {
        return Ok(());
    }

    let makefile = event.makefile()?;
    let mut script = Script::default();

    if config.is_active("black") {
        makefile.set("BLACK", which("black"));
        makefile.set("BLACK_OPTIONS", format!("--line-length {LINE_LENGTH}"));
        script.push("$(BLACK) $(BLACK_OPTIONS) . Projectfile");
    }

    if config.is_active("yapf") {
        makefile.set("YAPF", "$(PYTHON) -m yapf");
        let options = match config.style_config() {
            Some(path) => format!("-rip --style={}", path.display()),
            None => "-rip".to_string(),
        };
        makefile.set("YAPF_OPTIONS", options);
        script.push("$(YAPF) $(YAPF_OPTIONS) . Projectfile");
    }

    if config.is_active("isort") {
        makefile.set("ISORT", "$(PYTHON) -m isort");
        makefile.set("ISORT_OPTIONS", "--recursive --apply");
        script.push("$(ISORT) $(ISORT_OPTIONS) . Projectfile");
    }

    if config.is_active("prettier") {
        makefile.set("PRETTIER", which("prettier"));
        makefile.set("PRETTIER_OPTIONS", "--write");
        makefile.set("PRETTIER_PATTERNS", r"**/*.\{j,t\}s **/*.\{j,t\}sx \!docs/**");
        script.push("$(PRETTIER) $(PRETTIER_OPTIONS) $(PRETTIER_PATTERNS)");
    }

    let tools: Vec<&str> = config.active_tools().iter().map(String::as_str).collect();
    makefile
        .add_target(
            Target::new("format", script)
                .with_deps(["install-dev"])
                .phony()
                .with_doc(format!("Reformats the codebase (with {}).", tools.join(", "))),
        )
        .map_err(FeatureError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_using_known_tools() {
        let mut config = FormatConfig::default();
        config.using(["isort", "prettier"]).unwrap();
        assert!(config.is_active("isort"));
        assert!(config.is_active("prettier"));
        assert!(!config.is_active("black"));
    }

    #[test]
    fn test_using_unknown_tool_activates_nothing() {
        let mut config = FormatConfig::default();
        let err = config.using(["isort", "autopep8"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { ref feature, .. } if feature == "format"));
        assert!(config.active_tools().is_empty());
    }

    #[test]
    fn test_black_and_yapf_are_exclusive() {
        let mut config = FormatConfig::default();
        config.using(["black", "isort"]).unwrap();
        assert!(config.check_exclusive().is_ok());

        config.using(["yapf"]).unwrap();
        assert_eq!(
            config.check_exclusive(),
            Err(ConflictError::Options {
                feature: "format".to_string(),
                first: "black".to_string(),
                second: "yapf".to_string(),
            })
        );
    }

    #[test]
    fn test_conflicts_with_yapf_feature() {
        assert!(FormatFeature.conflicts_with("yapf"));
    }
}
