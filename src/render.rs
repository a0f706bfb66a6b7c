//! File rendering collaborator.
//!
//! Handlers never touch the filesystem directly; they go through a
//! `Renderer` so that every written file can be reported as closed.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::settings::Variables;

/// Writes files into the project tree.
pub trait Renderer: Debug {
    /// Render a named template to `path`.
    fn render_file(&self, path: &Path, template: &str, vars: &Variables) -> io::Result<PathBuf>;

    /// Render an inline template to `path`. The template is dedented first.
    fn render_file_inline(&self, path: &Path, raw: &str, vars: &Variables) -> io::Result<PathBuf>;

    /// Write `contents` to `path` as is.
    fn write_file(&self, path: &Path, contents: &str) -> io::Result<PathBuf>;
}

/// Named templates available to `render_file`.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    entries: HashMap<String, String>,
}

impl Templates {
    /// Create an empty template set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Templates shipped with the crate.
    pub fn builtin() -> Self {
        Self::new().with(
            "yapf/style.yapf.j2",
            include_str!("../templates/yapf/style.yapf.j2"),
        )
    }

    /// Add or replace a template.
    pub fn with(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.entries.insert(name.into(), body.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }
}

/// Renderer writing below a project directory.
#[derive(Debug, Clone)]
pub struct FsRenderer {
    root: PathBuf,
    templates: Templates,
}

impl FsRenderer {
    /// Create a renderer rooted at `root` using the builtin templates.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            templates: Templates::builtin(),
        }
    }

    /// Replace the template set.
    pub fn with_templates(mut self, templates: Templates) -> Self {
        self.templates = templates;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Renderer for FsRenderer {
    fn render_file(&self, path: &Path, template: &str, vars: &Variables) -> io::Result<PathBuf> {
        let body = self.templates.get(template).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("template not found: {template}"),
            )
        })?;
        self.write_file(path, &substitute(body, vars))
    }

    fn render_file_inline(&self, path: &Path, raw: &str, vars: &Variables) -> io::Result<PathBuf> {
        self.write_file(path, &substitute(&dedent(raw), vars))
    }

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<PathBuf> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "file written");
        Ok(path.to_path_buf())
    }
}

/// Replace `{{ name }}` placeholders. Unknown names render empty.
pub fn substitute(template: &str, vars: &Variables) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = rest[start + 2..start + 2 + len].trim();
        if let Some(value) = vars.get(key) {
            out.push_str(value);
        }
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    out
}

/// Strip the common leading indentation and surrounding blank lines.
pub fn dedent(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let body: Vec<&str> = lines
        .iter()
        .map(|line| strip_indent(line, indent).trim_end())
        .skip_while(|line| line.is_empty())
        .collect();
    let end = body
        .iter()
        .rposition(|line| !line.is_empty())
        .map_or(0, |i| i + 1);

    let mut out = body[..end].join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Drop up to `indent` leading whitespace chars.
fn strip_indent(line: &str, indent: usize) -> &str {
    let start = line
        .char_indices()
        .take_while(|(_, c)| c.is_whitespace())
        .take(indent)
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &line[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute() {
        let rendered = substitute(
            "name={{ name }} version={{version}} missing={{ nope }}",
            &vars(&[("name", "demo"), ("version", "1.0")]),
        );
        assert_eq!(rendered, "name=demo version=1.0 missing=");
    }

    #[test]
    fn test_substitute_unterminated() {
        assert_eq!(substitute("a {{ b", &Variables::new()), "a {{ b");
    }

    #[test]
    fn test_dedent() {
        let raw = "
            *.pyc
              /build

            /dist
        ";
        assert_eq!(dedent(raw), "*.pyc\n  /build\n\n/dist\n");
        assert_eq!(dedent("   \n  "), "");
    }

    #[test]
    fn test_dedent_multibyte_whitespace() {
        let raw = "\u{3000}\u{3000}a\n\u{3000}\u{3000}\u{3000}b";
        assert_eq!(dedent(raw), "a\n\u{3000}b\n");
        assert_eq!(dedent("\u{3000}x\n  y"), "x\n y\n");
    }

    #[test]
    fn test_fs_renderer_writes_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FsRenderer::new(dir.path());

        let written = renderer
            .render_file_inline(
                Path::new("nested/out.txt"),
                "\n    hello {{ who }}\n",
                &vars(&[("who", "world")]),
            )
            .unwrap();

        assert_eq!(written, PathBuf::from("nested/out.txt"));
        let text = fs::read_to_string(dir.path().join("nested/out.txt")).unwrap();
        assert_eq!(text, "hello world\n");
    }

    #[test]
    fn test_fs_renderer_named_template() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FsRenderer::new(dir.path());

        renderer
            .render_file(
                Path::new(".style.yapf"),
                "yapf/style.yapf.j2",
                &vars(&[("line_length", "120")]),
            )
            .unwrap();
        let text = fs::read_to_string(dir.path().join(".style.yapf")).unwrap();
        assert!(text.contains("column_limit = 120"));

        let err = renderer
            .render_file(Path::new("x"), "missing.j2", &Variables::new())
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
