//! Test-only helpers: a scripted command runner, a scripted prompter, fixed
//! templates and throwaway git repositories with a bare `origin`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use crate::core::error::{ClassifiedError, ErrorKind};
use crate::core::types::{CommandResult, CommandSpec};
use crate::io::prompt::Prompter;
use crate::io::runner::CommandRunner;
use crate::io::templates::{ContextQuery, Template, TemplateSource};

#[derive(Debug, Clone)]
enum Reply {
    Ok(String),
    Fail(ErrorKind, String),
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: Vec<String>,
    reply: Reply,
    once: bool,
    used: bool,
}

/// Runner that answers from a script and records every spec it sees.
///
/// Rules match on a prefix of `[program, args...]` and are tried in the
/// order they were added; `*_once` rules retire after one use. A command no
/// rule matches fails with command-failed so unexpected calls show up.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule(self, prefix: &[&str], reply: Reply, once: bool) -> Self {
        self.rules.borrow_mut().push(Rule {
            prefix: prefix.iter().map(|s| (*s).to_string()).collect(),
            reply,
            once,
            used: false,
        });
        self
    }

    pub fn ok(self, prefix: &[&str], stdout: &str) -> Self {
        self.rule(prefix, Reply::Ok(stdout.to_string()), false)
    }

    pub fn ok_once(self, prefix: &[&str], stdout: &str) -> Self {
        self.rule(prefix, Reply::Ok(stdout.to_string()), true)
    }

    pub fn fail(self, prefix: &[&str], kind: ErrorKind, message: &str) -> Self {
        self.rule(prefix, Reply::Fail(kind, message.to_string()), false)
    }

    pub fn fail_once(self, prefix: &[&str], kind: ErrorKind, message: &str) -> Self {
        self.rule(prefix, Reply::Fail(kind, message.to_string()), true)
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Recorded calls whose `[program, args...]` starts with `prefix`.
    pub fn count(&self, prefix: &[&str]) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|spec| matches_prefix(spec, prefix))
            .count()
    }
}

fn matches_prefix<S: AsRef<str>>(spec: &CommandSpec, prefix: &[S]) -> bool {
    let Some((program, rest)) = prefix.split_first() else {
        return true;
    };
    spec.program() == program.as_ref()
        && spec.args().len() >= rest.len()
        && spec.args().iter().zip(rest).all(|(a, b)| a == b.as_ref())
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ClassifiedError> {
        self.calls.borrow_mut().push(spec.clone());
        let mut rules = self.rules.borrow_mut();
        let rule = rules
            .iter_mut()
            .find(|rule| !(rule.once && rule.used) && matches_prefix(spec, &rule.prefix));
        let Some(rule) = rule else {
            return Err(ClassifiedError::new(
                ErrorKind::CommandFailed,
                format!("unscripted command: {spec}"),
            ));
        };
        rule.used = true;
        match &rule.reply {
            Reply::Ok(stdout) => Ok(CommandResult::new(stdout, 0)),
            Reply::Fail(kind, message) => Err(ClassifiedError::new(*kind, message.clone())
                .with_context("command", spec.to_string())),
        }
    }
}

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Confirm(bool),
    Select(usize),
    Multi(Vec<usize>),
    /// The user gave up (or the prompt timed out).
    Cancel,
}

/// Prompter that replays answers in order and records what was asked and
/// shown. Running out of answers reads as a cancellation.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<Answer>>,
    asked: RefCell<Vec<String>>,
    shown: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, answer: Answer) -> Self {
        self.answers.borrow_mut().push_back(answer);
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.answer(Answer::Text(text.to_string()))
    }

    pub fn confirm(self, yes: bool) -> Self {
        self.answer(Answer::Confirm(yes))
    }

    pub fn select(self, index: usize) -> Self {
        self.answer(Answer::Select(index))
    }

    pub fn multi(self, indices: &[usize]) -> Self {
        self.answer(Answer::Multi(indices.to_vec()))
    }

    pub fn cancel(self) -> Self {
        self.answer(Answer::Cancel)
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.borrow().len()
    }

    fn next(&self, message: &str) -> Result<Answer, ClassifiedError> {
        self.asked.borrow_mut().push(message.to_string());
        match self.answers.borrow_mut().pop_front() {
            Some(Answer::Cancel) | None => Err(ClassifiedError::cancelled(format!(
                "no answer for '{message}'"
            ))),
            Some(answer) => Ok(answer),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, message: &str, default: Option<&str>) -> Result<String, ClassifiedError> {
        match self.next(message)? {
            Answer::Text(text) if text.trim().is_empty() => {
                Ok(default.unwrap_or_default().to_string())
            }
            Answer::Text(text) => Ok(text.trim().to_string()),
            other => panic!("prompt '{message}' wanted text, script has {other:?}"),
        }
    }

    fn confirm(&self, message: &str, _default: bool) -> Result<bool, ClassifiedError> {
        match self.next(message)? {
            Answer::Confirm(yes) => Ok(yes),
            other => panic!("prompt '{message}' wanted a confirmation, script has {other:?}"),
        }
    }

    fn select(&self, message: &str, choices: &[String]) -> Result<usize, ClassifiedError> {
        match self.next(message)? {
            Answer::Select(index) => {
                assert!(
                    index < choices.len(),
                    "prompt '{message}': choice {index} out of {choices:?}"
                );
                Ok(index)
            }
            other => panic!("prompt '{message}' wanted a selection, script has {other:?}"),
        }
    }

    fn multi_select(
        &self,
        message: &str,
        choices: &[String],
        _preselected: &[usize],
    ) -> Result<Vec<usize>, ClassifiedError> {
        match self.next(message)? {
            Answer::Multi(indices) => {
                assert!(
                    indices.iter().all(|i| *i < choices.len()),
                    "prompt '{message}': choices {indices:?} out of {choices:?}"
                );
                Ok(indices)
            }
            other => panic!("prompt '{message}' wanted a multi-selection, script has {other:?}"),
        }
    }

    fn show(&self, text: &str) {
        self.shown.borrow_mut().push(text.to_string());
    }
}

/// Fixed in-memory templates.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplates {
    pub issue: Vec<Template>,
    pub pull_request: Option<Template>,
}

impl StaticTemplates {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_pull_request(contents: &str) -> Self {
        Self {
            issue: Vec::new(),
            pull_request: Some(Template {
                name: "PULL_REQUEST_TEMPLATE.md".to_string(),
                contents: contents.to_string(),
            }),
        }
    }
}

impl TemplateSource for StaticTemplates {
    fn issue_templates(&self) -> Vec<Template> {
        self.issue.clone()
    }

    fn pull_request_template(&self) -> Option<Template> {
        self.pull_request.clone()
    }

    fn pull_request_context(&self) -> Option<ContextQuery> {
        self.pull_request.as_ref().map(|_| ContextQuery::OpenIssues)
    }
}

/// A working clone on `main` with one commit, tracking a bare `origin`.
pub struct TestRepo {
    _temp: TempDir,
    root: PathBuf,
    origin: PathBuf,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("tempdir")?;
        let origin = temp.path().join("origin.git");
        let root = temp.path().join("work");
        fs::create_dir_all(&origin).context("create origin dir")?;
        fs::create_dir_all(&root).context("create work dir")?;

        git_in(&origin, &["init", "--bare", "-q"])?;
        git_in(&origin, &["symbolic-ref", "HEAD", "refs/heads/main"])?;

        init_work_tree(&root)?;
        fs::write(root.join("README.md"), "hi\n").context("write README")?;
        git_in(&root, &["add", "README.md"])?;
        git_in(&root, &["commit", "-q", "-m", "chore: init"])?;
        let origin_str = origin.to_string_lossy().into_owned();
        git_in(&root, &["remote", "add", "origin", &origin_str])?;
        git_in(&root, &["push", "-q", "-u", "origin", "main"])?;

        Ok(Self {
            _temp: temp,
            root,
            origin,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Run git in the working clone; returns trimmed stdout.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        git_in(&self.root, args)
    }

    pub fn commit_file(&self, name: &str, contents: &str, message: &str) -> Result<()> {
        write_and_commit(&self.root, name, contents, message)
    }

    /// Push a commit to `origin/<branch>` from a second clone, so the working
    /// clone falls behind without knowing it yet.
    pub fn advance_origin(&self, branch: &str, name: &str, contents: &str) -> Result<()> {
        let other = self._temp.path().join(format!("other-{}", unique_suffix()));
        let origin_str = self.origin.to_string_lossy().into_owned();
        let other_str = other.to_string_lossy().into_owned();
        git_in(
            self._temp.path(),
            &["clone", "-q", "--branch", branch, &origin_str, &other_str],
        )?;
        git_in(&other, &["config", "user.email", "other@example.com"])?;
        git_in(&other, &["config", "user.name", "other"])?;
        git_in(&other, &["config", "commit.gpgsign", "false"])?;
        write_and_commit(&other, name, contents, &format!("upstream: {name}"))?;
        git_in(&other, &["push", "-q", "origin", branch])?;
        Ok(())
    }
}

fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

fn init_work_tree(root: &Path) -> Result<()> {
    git_in(root, &["init", "-q"])?;
    git_in(root, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
    git_in(root, &["config", "user.email", "test@example.com"])?;
    git_in(root, &["config", "user.name", "test"])?;
    git_in(root, &["config", "commit.gpgsign", "false"])?;
    Ok(())
}

fn write_and_commit(root: &Path, name: &str, contents: &str, message: &str) -> Result<()> {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    git_in(root, &["add", name])?;
    git_in(root, &["commit", "-q", "-m", message])?;
    Ok(())
}

fn git_in(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
