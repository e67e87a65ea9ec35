//! Shared data types for the command pipeline and the workflows built on it.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One external invocation: a trusted program plus a discrete argument list.
///
/// Arguments are never joined into a shell string, so user-supplied titles and
/// branch names cannot inject shell syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn git<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("git", args)
    }

    pub fn gh<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("gh", args)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// True when the argument list starts with `prefix`.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.args.len() >= prefix.len()
            && self
                .args
                .iter()
                .zip(prefix)
                .all(|(arg, expected)| arg == expected)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Output of a successful invocation. `stdout` has trailing whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn new(stdout: impl AsRef<str>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.as_ref().trim_end().to_string(),
            exit_code,
        }
    }

    /// Non-empty stdout lines with surrounding whitespace removed.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

/// Divergence of a local branch from the fetched remote base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BranchSyncStatus {
    pub is_synced: bool,
    pub behind: u32,
    pub ahead: u32,
}

impl BranchSyncStatus {
    /// `ahead` never affects `is_synced`.
    pub fn new(behind: u32, ahead: u32) -> Self {
        Self {
            is_synced: behind == 0,
            behind,
            ahead,
        }
    }
}

/// Parse `git rev-list --left-right --count <base>...<local>` output.
///
/// The left column counts commits only on the base (behind), the right column
/// commits only on the local branch (ahead).
pub fn parse_divergence(output: &str) -> Option<BranchSyncStatus> {
    let mut parts = output.split_whitespace();
    let behind = parts.next()?.parse().ok()?;
    let ahead = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(BranchSyncStatus::new(behind, ahead))
}

pub const NO_LABEL: &str = "none";

/// Read-only projection of an open issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: String,
    pub title: String,
    /// First label name, or `"none"`.
    pub label: String,
}

impl Issue {
    /// Parse one `number<TAB>title<TAB>label` row.
    pub fn from_tsv(line: &str) -> Option<Self> {
        let mut cols = line.split('\t');
        let number = cols.next()?.trim();
        if number.is_empty() {
            return None;
        }
        let title = cols.next().unwrap_or("").trim();
        let label = cols
            .next()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or(NO_LABEL);
        Some(Self {
            number: number.to_string(),
            title: title.to_string(),
            label: label.to_string(),
        })
    }

    pub fn has_label(&self) -> bool {
        self.label != NO_LABEL
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.has_label() {
            format!("[{}]", self.label)
        } else {
            "[no label]".to_string()
        };
        write!(f, "#{} {} {}", self.number, self.title, label)
    }
}

/// Read-only projection of an open pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSummary {
    pub number: String,
    pub title: String,
    pub head: String,
    pub is_draft: bool,
}

impl PullRequestSummary {
    /// Parse one `number<TAB>title<TAB>head<TAB>isDraft` row.
    pub fn from_tsv(line: &str) -> Option<Self> {
        let mut cols = line.split('\t');
        let number = cols.next()?.trim();
        if number.is_empty() {
            return None;
        }
        Some(Self {
            number: number.to_string(),
            title: cols.next().unwrap_or("").trim().to_string(),
            head: cols.next().unwrap_or("").trim().to_string(),
            is_draft: cols.next().map(str::trim) == Some("true"),
        })
    }
}

impl fmt::Display for PullRequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let draft = if self.is_draft { " (draft)" } else { "" };
        write!(f, "#{} {} [{}]{}", self.number, self.title, self.head, draft)
    }
}

/// Issue or pull request returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "author_login")]
    pub author: String,
    #[serde(default, deserialize_with = "label_names")]
    pub labels: Vec<String>,
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} ({}, @{})", self.number, self.title, self.state, self.author)?;
        if !self.labels.is_empty() {
            write!(f, " [{}]", self.labels.join(", "))?;
        }
        Ok(())
    }
}

fn author_login<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Author {
        login: String,
    }
    let author: Option<Author> = Option::deserialize(deserializer)?;
    Ok(author.map_or_else(|| "unknown".to_string(), |a| a.login))
}

fn label_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Label {
        name: String,
    }
    let labels: Option<Vec<Label>> = Option::deserialize(deserializer)?;
    Ok(labels
        .unwrap_or_default()
        .into_iter()
        .map(|label| label.name)
        .collect())
}

/// Repository-level counters exposed to the statistics view.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub name_with_owner: String,
    pub stargazer_count: u64,
    pub fork_count: u64,
    #[serde(default, deserialize_with = "total_count")]
    pub watchers: u64,
    #[serde(default, deserialize_with = "total_count")]
    pub issues: u64,
    #[serde(default, deserialize_with = "total_count")]
    pub pull_requests: u64,
}

fn total_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Connection {
        total_count: u64,
    }
    let conn: Option<Connection> = Option::deserialize(deserializer)?;
    Ok(conn.map_or(0, |c| c.total_count))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub login: String,
    pub contributions: u64,
}

impl Contributor {
    pub fn from_tsv(line: &str) -> Option<Self> {
        let (login, count) = line.split_once('\t')?;
        Some(Self {
            login: login.trim().to_string(),
            contributions: count.trim().parse().ok()?,
        })
    }
}

/// Branch-type descriptor from configuration (e.g. `feature`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchType {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl BranchType {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.description)
    }
}

/// Pull request metadata, gathered step by step and consumed once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestDraft {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub reviewers: Option<String>,
    pub assignees: Option<String>,
    pub labels: BTreeSet<String>,
    pub milestone: Option<String>,
    pub is_draft: bool,
}

impl PullRequestDraft {
    pub fn into_command(self) -> CommandSpec {
        let mut args = vec![
            "pr".to_string(),
            "create".to_string(),
            "--title".to_string(),
            self.title,
            "--body".to_string(),
            self.body,
            "--head".to_string(),
            self.head,
            "--base".to_string(),
            self.base,
        ];
        push_optional(&mut args, "--reviewer", self.reviewers);
        push_optional(&mut args, "--assignee", self.assignees);
        push_labels(&mut args, &self.labels);
        push_optional(&mut args, "--milestone", self.milestone);
        if self.is_draft {
            args.push("--draft".to_string());
        }
        CommandSpec::gh(args)
    }
}

/// Issue metadata, consumed once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
    pub assignees: Option<String>,
    pub labels: BTreeSet<String>,
    pub milestone: Option<String>,
}

impl IssueDraft {
    pub fn into_command(self) -> CommandSpec {
        let mut args = vec![
            "issue".to_string(),
            "create".to_string(),
            "--title".to_string(),
            self.title,
            "--body".to_string(),
            self.body,
        ];
        push_optional(&mut args, "--assignee", self.assignees);
        push_labels(&mut args, &self.labels);
        push_optional(&mut args, "--milestone", self.milestone);
        CommandSpec::gh(args)
    }
}

/// A label that already passed validation. Build it with
/// [`crate::core::validate::label_draft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDraft {
    pub(crate) name: String,
    pub(crate) color: String,
    pub(crate) description: Option<String>,
}

impl LabelDraft {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper-case `RRGGBB`, no leading `#`.
    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn into_command(self) -> CommandSpec {
        let mut args = vec![
            "label".to_string(),
            "create".to_string(),
            self.name,
            "--color".to_string(),
            self.color,
        ];
        push_optional(&mut args, "--description", self.description);
        CommandSpec::gh(args)
    }
}

fn push_optional(args: &mut Vec<String>, flag: &str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        args.push(flag.to_string());
        args.push(value);
    }
}

fn push_labels(args: &mut Vec<String>, labels: &BTreeSet<String>) {
    if !labels.is_empty() {
        args.push("--label".to_string());
        args.push(labels.iter().cloned().collect::<Vec<_>>().join(","));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_result_trims_trailing_whitespace_only() {
        let result = CommandResult::new("  main\n\n", 0);
        assert_eq!(result.stdout, "  main");
    }

    #[test]
    fn parse_divergence_reads_behind_then_ahead() {
        let status = parse_divergence("0\t2\n").expect("parse");
        assert_eq!(
            status,
            BranchSyncStatus {
                is_synced: true,
                behind: 0,
                ahead: 2
            }
        );
        let behind = parse_divergence("3 1").expect("parse");
        assert!(!behind.is_synced);
        assert_eq!(behind.behind, 3);
    }

    #[test]
    fn parse_divergence_rejects_garbage() {
        assert!(parse_divergence("").is_none());
        assert!(parse_divergence("x\t1").is_none());
        assert!(parse_divergence("1\t2\t3").is_none());
    }

    #[test]
    fn issue_from_tsv_defaults_missing_label() {
        let issue = Issue::from_tsv("42\tFix login bug\t").expect("parse");
        assert_eq!(issue.label, NO_LABEL);
        assert!(!issue.has_label());
        let labelled = Issue::from_tsv("7\tCrash\tbug").expect("parse");
        assert_eq!(labelled.label, "bug");
        assert_eq!(labelled.to_string(), "#7 Crash [bug]");
    }

    #[test]
    fn pr_draft_builds_discrete_arguments() {
        let draft = PullRequestDraft {
            title: "Add login; rm -rf /".to_string(),
            body: "body".to_string(),
            head: "feature/1-login".to_string(),
            base: "main".to_string(),
            reviewers: Some("alice".to_string()),
            assignees: Some(String::new()),
            labels: ["bug".to_string(), "api".to_string()].into_iter().collect(),
            milestone: None,
            is_draft: true,
        };
        let cmd = draft.into_command();
        assert_eq!(cmd.program(), "gh");
        assert!(cmd.starts_with(&["pr", "create", "--title", "Add login; rm -rf /"]));
        assert!(cmd.args().contains(&"--draft".to_string()));
        assert!(!cmd.args().contains(&"--assignee".to_string()));
        let label_pos = cmd.args().iter().position(|a| a == "--label").expect("label");
        assert_eq!(cmd.args()[label_pos + 1], "api,bug");
    }

    #[test]
    fn search_hit_flattens_author_and_labels() {
        let hit: SearchHit = serde_json::from_str(
            r#"{"number":3,"title":"t","state":"OPEN","author":{"login":"bob"},"labels":[{"name":"bug"}]}"#,
        )
        .expect("parse");
        assert_eq!(hit.author, "bob");
        assert_eq!(hit.labels, vec!["bug".to_string()]);
        let anonymous: SearchHit =
            serde_json::from_str(r#"{"number":4,"title":"t","author":null}"#).expect("parse");
        assert_eq!(anonymous.author, "unknown");
    }
}
