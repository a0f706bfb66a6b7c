//! In-memory Makefile artifact.
//!
//! Features contribute variables and targets during their generate phase; the
//! session renders the result once the owning feature's event completes.

use std::fmt;

use crate::error::ConflictError;

/// Shell lines forming a target recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<String>,
}

impl Script {
    /// Create a script from newline separated text.
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            lines: text
                .as_ref()
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Append a line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Recipe lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Check whether the script has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A Makefile target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: String,
    script: Script,
    deps: Vec<String>,
    phony: bool,
    doc: Option<String>,
}

impl Target {
    /// Create a target with the given recipe.
    pub fn new(name: impl Into<String>, script: Script) -> Self {
        Self {
            name: name.into(),
            script,
            deps: Vec::new(),
            phony: false,
            doc: None,
        }
    }

    /// Add prerequisites.
    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Mark the target as phony.
    pub fn phony(mut self) -> Self {
        self.phony = true;
        self
    }

    /// Attach a help line.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    pub fn is_phony(&self) -> bool {
        self.phony
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

/// A Makefile under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Makefile {
    env: Vec<(String, String)>,
    targets: Vec<Target>,
}

impl Makefile {
    /// Create an empty Makefile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a variable. Re-assigning keeps the original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.env.push((key, value)),
        }
    }

    /// Read a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Variables in assignment order.
    pub fn env(&self) -> impl Iterator<Item = (&str, &str)> {
        self.env.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Register a target. Each target name may only be defined once.
    pub fn add_target(&mut self, target: Target) -> Result<(), ConflictError> {
        if self.has_target(target.name()) {
            return Err(ConflictError::Target(target.name().to_string()));
        }
        self.targets.push(target);
        Ok(())
    }

    /// Look up a target.
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name() == name)
    }

    pub fn has_target(&self, name: &str) -> bool {
        self.target(name).is_some()
    }

    /// Targets in registration order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }
}

impl fmt::Display for Makefile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            writeln!(f, "{key} ?= {value}")?;
        }

        let phony: Vec<&str> = self
            .targets
            .iter()
            .filter(|t| t.is_phony())
            .map(Target::name)
            .collect();
        if !phony.is_empty() {
            writeln!(f)?;
            writeln!(f, ".PHONY: {}", phony.join(" "))?;
        }

        for target in &self.targets {
            writeln!(f)?;
            if let Some(doc) = target.doc() {
                writeln!(f, "# {doc}")?;
            }
            if target.deps().is_empty() {
                writeln!(f, "{}:", target.name())?;
            } else {
                writeln!(f, "{}: {}", target.name(), target.deps().join(" "))?;
            }
            for line in target.script().lines() {
                writeln!(f, "\t{line}")?;
            }
        }
        Ok(())
    }
}
