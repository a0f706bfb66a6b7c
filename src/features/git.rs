//! Git version control support.
//!
//! Creates the repository on first generation, stages every file the session
//! closes, writes `.gitignore` and exposes `VERSION` to the Makefile.
//!
//! Disabling the feature skips repository creation and staging; `.gitignore`
//! and `VERSION` are still managed, so the project should live inside some
//! git repository.

use std::any::Any;

use tracing::{debug, info};

use crate::config::FeatureConfig;
use crate::dispatcher::EventContext;
use crate::error::FeatureResult;
use crate::event::{Event, EventNames};
use crate::feature::{Binding, Feature};
use crate::priority::Priority;

pub const NAME: &str = "git";

const GITIGNORE: &str = r#"
    *.egg-info
    *.iml
    *.pyc
    *.swp
    /.cache
    /.coverage
    /.idea
    /.python*-*
    /build
    /dist
    /htmlcov
    /pylint.html
"#;

const VERSION: &str = "$(shell git describe 2>/dev/null || git rev-parse --short HEAD)";

#[derive(Debug, Clone)]
pub struct GitConfig {
    enabled: bool,
}

impl GitConfig {
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl FeatureConfig for GitConfig {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GitFeature;

impl Feature for GitFeature {
    fn name(&self) -> &str {
        NAME
    }

    fn create_config(&self) -> Box<dyn FeatureConfig> {
        Box::new(GitConfig::default())
    }

    fn bindings(&self, events: &EventNames) -> Vec<Binding> {
        vec![
            Binding::new(events.on_start(), Priority::ABSOLUTE, on_start),
            Binding::new(events.on_file_closed(), Priority::new(-1), on_file_closed),
            Binding::new(events.on_end(), Priority::DEFAULT, on_end),
            Binding::new(
                events.on_generate(super::make::NAME),
                Priority::ABSOLUTE.after(),
                on_make_generate,
            ),
        ]
    }
}

fn enabled(ctx: &EventContext<'_>) -> FeatureResult<bool> {
    Ok(ctx.configs().read(NAME, GitConfig::is_enabled)?)
}

fn on_start(_event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    if !enabled(ctx)? {
        return Ok(());
    }

    let project_dir = ctx.settings().project_dir();
    if project_dir.join(".git").exists() {
        debug!(path = %project_dir.display(), "git repository already present");
        return Ok(());
    }

    info!(path = %project_dir.display(), "creating git repository");
    ctx.run(&["git", "init"])?;
    if project_dir.join("Projectfile").exists() {
        ctx.run(&["git", "add", "Projectfile"])?;
        ctx.run(&["git", "commit", "-m", "Project initialized."])?;
    }
    Ok(())
}

fn on_file_closed(event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    if !enabled(ctx)? {
        return Ok(());
    }
    if let Some(path) = event.filename() {
        let path = path.to_string_lossy();
        ctx.run(&["git", "add", &*path])?;
    }
    Ok(())
}

fn on_end(_event: &mut Event<'_>, ctx: &EventContext<'_>) -> FeatureResult<()> {
    ctx.render_file_inline(".gitignore", GITIGNORE, ctx.settings().variables())?;
    Ok(())
}

fn on_make_generate(event: &mut Event<'_>, _ctx: &EventContext<'_>) -> FeatureResult<()> {
    event.makefile()?.set("VERSION", VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_toggle() {
        let mut config = GitConfig::default();
        assert!(config.is_enabled());
        config.disable();
        assert!(!config.is_enabled());
        config.enable();
        assert!(config.is_enabled());
    }

    #[test]
    fn test_bindings() {
        let bindings = GitFeature.bindings(&EventNames::new("t"));
        let start = bindings.iter().find(|b| b.event() == "t.on_start").unwrap();
        assert_eq!(start.priority(), Priority::ABSOLUTE);
        let make = bindings
            .iter()
            .find(|b| b.event() == "t.feature.make.on_generate")
            .unwrap();
        assert_eq!(make.priority(), Priority::ABSOLUTE.after());
    }
}
