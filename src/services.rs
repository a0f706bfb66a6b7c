//! External collaborators injected into a session.

use std::fmt::Debug;
use std::io;
use std::path::Path;
use std::process::{Command, Output};

use tracing::debug;

use crate::error::{FeatureError, FeatureResult};
use crate::render::{FsRenderer, Renderer};

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// A successful run with no output.
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            ..Self::default()
        }
    }

    /// Turn a non-zero exit into a `FeatureError::Command`.
    pub fn checked(self, argv: &[&str]) -> FeatureResult<Self> {
        if self.success {
            return Ok(self);
        }
        Err(FeatureError::Command {
            command: argv.join(" "),
            code: self.code.unwrap_or(-1),
            stderr: self.stderr.trim().to_string(),
        })
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Runs external programs on behalf of handlers.
pub trait CommandRunner: Debug {
    /// Run `argv` in `cwd` and capture its output.
    fn run(&self, argv: &[&str], cwd: &Path) -> io::Result<CommandOutput>;
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[&str], cwd: &Path) -> io::Result<CommandOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;
        debug!(command = %argv.join(" "), cwd = %cwd.display(), "running command");
        let output = Command::new(program).args(args).current_dir(cwd).output()?;
        Ok(CommandOutput::from(output))
    }
}

/// The collaborators a session hands to its handlers.
#[derive(Debug)]
pub struct Services {
    runner: Box<dyn CommandRunner>,
    renderer: Box<dyn Renderer>,
}

impl Services {
    /// Create services from explicit collaborators.
    pub fn new(runner: Box<dyn CommandRunner>, renderer: Box<dyn Renderer>) -> Self {
        Self { runner, renderer }
    }

    /// Real process runner and a filesystem renderer rooted at `project_dir`.
    pub fn system(project_dir: impl AsRef<Path>) -> Self {
        Self::new(
            Box::new(SystemRunner),
            Box::new(FsRenderer::new(project_dir.as_ref())),
        )
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }
}
