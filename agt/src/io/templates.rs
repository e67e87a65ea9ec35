//! Issue and pull request body templates from `.github/`.
//!
//! Templates are raw Markdown. The only processing is filling `{{ Name }}`
//! placeholders with prompted answers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::core::error::ClassifiedError;
use crate::io::prompt::Prompter;

/// Data a body template wants the user to see before it is filled in. The
/// workflow fetches and displays it; the template source never calls back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextQuery {
    OpenIssues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub contents: String,
}

pub trait TemplateSource {
    fn issue_templates(&self) -> Vec<Template>;

    fn pull_request_template(&self) -> Option<Template>;

    /// Asked before [`pull_request_template`](Self::pull_request_template)
    /// is filled in.
    fn pull_request_context(&self) -> Option<ContextQuery>;
}

/// Reads `.github/ISSUE_TEMPLATE/*.md` and `.github/PULL_REQUEST_TEMPLATE.md`
/// under a repository root.
#[derive(Debug, Clone)]
pub struct FileTemplates {
    root: PathBuf,
}

impl FileTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn issue_dir(&self) -> PathBuf {
        self.root.join(".github").join("ISSUE_TEMPLATE")
    }

    fn pull_request_path(&self) -> PathBuf {
        self.root.join(".github").join("PULL_REQUEST_TEMPLATE.md")
    }
}

fn read_template(path: &Path) -> Option<Template> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    match fs::read_to_string(path) {
        Ok(contents) => Some(Template { name, contents }),
        Err(err) => {
            warn!(path = %path.display(), err = %err, "unreadable template skipped");
            None
        }
    }
}

impl TemplateSource for FileTemplates {
    fn issue_templates(&self) -> Vec<Template> {
        let Ok(entries) = fs::read_dir(self.issue_dir()) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();
        paths.iter().filter_map(|path| read_template(path)).collect()
    }

    fn pull_request_template(&self) -> Option<Template> {
        let path = self.pull_request_path();
        if !path.is_file() {
            return None;
        }
        read_template(&path)
    }

    fn pull_request_context(&self) -> Option<ContextQuery> {
        self.pull_request_path()
            .is_file()
            .then_some(ContextQuery::OpenIssues)
    }
}

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Placeholder names in first-appearance order, without repeats.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Ask for every placeholder once and substitute the answers.
pub fn fill_placeholders(template: &str, prompter: &dyn Prompter) -> Result<String, ClassifiedError> {
    let mut answers = Vec::new();
    for name in placeholders(template) {
        let value = prompter.input(&name, None)?;
        answers.push((name, value));
    }
    Ok(PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            answers
                .iter()
                .find(|(name, _)| name == &caps[1])
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        })
        .into_owned())
}
