//! Closed error taxonomy for the command pipeline.
//!
//! Every failure that leaves the pipeline is a [`ClassifiedError`]: exactly one
//! [`ErrorKind`], the original message, and a small string map of context
//! (offending command, working directory, ...). The kind decides retry
//! eligibility, the exit code, and the remediation hint shown to the user.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// External tools the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Git,
    Gh,
}

impl Tool {
    pub fn from_program(program: &str) -> Option<Self> {
        match program {
            "git" => Some(Self::Git),
            "gh" => Some(Self::Gh),
            _ => None,
        }
    }

    pub fn program(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Gh => "gh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidInput {
    General,
    IssueNumber,
    BranchName,
    Color,
    EmptyField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    General,
    Branch,
    Issue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    General,
    /// No commits between base and head.
    EmptyPullRequest,
    /// Rebase stopped on conflicts; needs a human.
    RebaseConflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RepositoryMissing,
    /// `None` when the missing program is not one of the two known tools.
    ToolMissing(Option<Tool>),
    AuthFailed,
    CommandFailed,
    NetworkError { rate_limited: bool },
    NetworkTimeout,
    ConnectionRefused,
    InvalidInput(InvalidInput),
    ResourceNotFound(Resource),
    OperationFailed(Failure),
    OperationCancelled,
    Unknown,
}

/// Human-facing description of an error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    pub title: &'static str,
    pub explanation: &'static str,
    pub remediation: Option<&'static str>,
    pub docs: Option<&'static str>,
}

const fn hint(
    title: &'static str,
    explanation: &'static str,
    remediation: Option<&'static str>,
    docs: Option<&'static str>,
) -> Hint {
    Hint {
        title,
        explanation,
        remediation,
        docs,
    }
}

impl ErrorKind {
    /// Stable kebab-case identifier used in logs.
    pub fn code(self) -> &'static str {
        match self {
            Self::RepositoryMissing => "repository-missing",
            Self::ToolMissing(_) => "tool-missing",
            Self::AuthFailed => "auth-failed",
            Self::CommandFailed => "command-failed",
            Self::NetworkError { rate_limited: true } => "network-error/rate-limit",
            Self::NetworkError { .. } => "network-error",
            Self::NetworkTimeout => "network-timeout",
            Self::ConnectionRefused => "connection-refused",
            Self::InvalidInput(InvalidInput::General) => "invalid-input",
            Self::InvalidInput(InvalidInput::IssueNumber) => "invalid-input/issue-number",
            Self::InvalidInput(InvalidInput::BranchName) => "invalid-input/branch-name",
            Self::InvalidInput(InvalidInput::Color) => "invalid-input/color",
            Self::InvalidInput(InvalidInput::EmptyField) => "invalid-input/empty-field",
            Self::ResourceNotFound(Resource::General) => "resource-not-found",
            Self::ResourceNotFound(Resource::Branch) => "resource-not-found/branch",
            Self::ResourceNotFound(Resource::Issue) => "resource-not-found/issue",
            Self::OperationFailed(Failure::General) => "operation-failed",
            Self::OperationFailed(Failure::EmptyPullRequest) => "operation-failed/empty-pull-request",
            Self::OperationFailed(Failure::RebaseConflict) => "operation-failed/rebase-conflict",
            Self::OperationCancelled => "operation-cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Only network-class failures may be retried, and only for reads.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. } | Self::NetworkTimeout | Self::ConnectionRefused
        )
    }

    pub fn is_invalid_input(self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    pub fn hint(self) -> Hint {
        match self {
            Self::RepositoryMissing => hint(
                "Not a Git Repository",
                "This directory is not a Git repository.",
                Some("Initialize a repository with: git init\nOr clone an existing one with: git clone <url>"),
                Some("https://git-scm.com/docs/git-init"),
            ),
            Self::ToolMissing(Some(Tool::Git)) => hint(
                "Git Not Found",
                "Git is not installed or not available in your PATH.",
                Some("Install Git from: https://git-scm.com/downloads"),
                Some("https://git-scm.com/book/en/v2/Getting-Started-Installing-Git"),
            ),
            Self::ToolMissing(Some(Tool::Gh)) => hint(
                "GitHub CLI Not Found",
                "GitHub CLI (gh) is not installed or not available in your PATH.",
                Some("Install GitHub CLI from: https://cli.github.com\nOr run: brew install gh (macOS)\n       apt install gh (Ubuntu)"),
                Some("https://cli.github.com/manual/installation"),
            ),
            Self::ToolMissing(None) => hint(
                "Program Not Found",
                "A required program is not installed or not available in your PATH.",
                Some("Install the program and make sure it is on your PATH."),
                None,
            ),
            Self::AuthFailed => hint(
                "GitHub Authentication Failed",
                "You are not authenticated with GitHub CLI.",
                Some("Authenticate with: gh auth login\nFollow the prompts to complete authentication."),
                Some("https://cli.github.com/manual/gh_auth_login"),
            ),
            Self::CommandFailed => hint(
                "Command Failed",
                "An external git or gh command failed to execute.",
                Some("Check the command output above for details."),
                Some("https://cli.github.com/manual/"),
            ),
            Self::NetworkError { rate_limited: true } => hint(
                "GitHub API Rate Limit Exceeded",
                "You have exceeded the GitHub API rate limit.",
                Some("Wait for the rate limit to reset or authenticate for higher limits."),
                Some("https://docs.github.com/en/rest/overview/resources-in-the-rest-api#rate-limiting"),
            ),
            Self::NetworkError { .. } => hint(
                "Network Error",
                "A network error occurred while connecting to GitHub.",
                Some("Check your internet connection.\nVerify that GitHub is accessible: https://www.githubstatus.com/"),
                None,
            ),
            Self::NetworkTimeout => hint(
                "Network Timeout",
                "The request timed out while waiting for a response.",
                Some("Check your internet connection and try again."),
                None,
            ),
            Self::ConnectionRefused => hint(
                "Connection Refused",
                "The connection was refused by the remote server.",
                Some("Check your internet connection and firewall settings."),
                None,
            ),
            Self::InvalidInput(InvalidInput::General) => hint(
                "Invalid Input",
                "The provided input is invalid.",
                Some("Please check the input format and try again."),
                None,
            ),
            Self::InvalidInput(InvalidInput::IssueNumber) => hint(
                "Invalid Issue Number",
                "The issue number must be a positive integer.",
                Some("Enter a valid issue number (e.g., 1, 42, 123)."),
                None,
            ),
            Self::InvalidInput(InvalidInput::BranchName) => hint(
                "Invalid Branch Name",
                "The branch name contains invalid characters.",
                Some("Use only letters, numbers, hyphens, underscores and slashes.\nAvoid spaces and special characters."),
                Some("https://git-scm.com/docs/git-check-ref-format"),
            ),
            Self::InvalidInput(InvalidInput::Color) => hint(
                "Invalid Color Code",
                "The color code must be a 6-digit hexadecimal value.",
                Some("Use format: RRGGBB or #RRGGBB (e.g., FF5733 or #FF5733)."),
                None,
            ),
            Self::InvalidInput(InvalidInput::EmptyField) => hint(
                "Required Field Empty",
                "A required field cannot be empty.",
                Some("Please provide a value for the required field."),
                None,
            ),
            Self::ResourceNotFound(Resource::General) => hint(
                "Resource Not Found",
                "The requested resource could not be found.",
                Some("Verify that the resource exists and try again."),
                None,
            ),
            Self::ResourceNotFound(Resource::Branch) => hint(
                "Branch Not Found",
                "The specified branch does not exist.",
                Some("Check available branches with: git branch -a"),
                None,
            ),
            Self::ResourceNotFound(Resource::Issue) => hint(
                "Issue Not Found",
                "The specified issue does not exist.",
                Some("Check available issues with: agt list"),
                None,
            ),
            Self::OperationFailed(Failure::General) => hint(
                "Operation Failed",
                "The operation failed to complete.",
                Some("Check the error details above and try again."),
                None,
            ),
            Self::OperationFailed(Failure::EmptyPullRequest) => hint(
                "Nothing To Open",
                "There are no commits between the base branch and your branch.",
                Some("Commit your changes before creating a pull request."),
                None,
            ),
            Self::OperationFailed(Failure::RebaseConflict) => hint(
                "Rebase Conflict",
                "Your branch could not be rebased onto the base branch without conflicts.",
                Some("Resolve the conflicts, then run: git rebase --continue\nOr give up with: git rebase --abort\nRun agt pr again afterwards."),
                Some("https://git-scm.com/docs/git-rebase"),
            ),
            Self::OperationCancelled => hint(
                "Operation Cancelled",
                "The operation was cancelled.",
                None,
                None,
            ),
            Self::Unknown => hint(
                "Unknown Error",
                "An unexpected error occurred.",
                Some("Run again with --debug and check ~/.agt/agt.log for details."),
                None,
            ),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failure mapped onto exactly one [`ErrorKind`].
///
/// Context is attached while the error is being built and is read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    message: String,
    context: BTreeMap<String, String>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn invalid_input(kind: InvalidInput, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput(kind), message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OperationCancelled, message)
    }

    pub fn operation_failed(failure: Failure, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OperationFailed(failure), message)
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Multi-line report: title, explanation, details, context, remediation.
    pub fn render(&self) -> String {
        let hint = self.kind.hint();
        let mut out = format!("\nerror: {}\n\n{}\n", hint.title, hint.explanation);
        if !self.message.is_empty() && self.message != hint.explanation {
            out.push_str(&format!("\nDetails: {}\n", self.message));
        }
        for (key, value) in &self.context {
            out.push_str(&format!("  {key}: {value}\n"));
        }
        if let Some(remediation) = hint.remediation {
            out.push_str("\nSolution:\n");
            for line in remediation.lines() {
                out.push_str(&format!("   {line}\n"));
            }
        }
        if let Some(docs) = hint.docs {
            out.push_str(&format!("\nDocumentation:\n   {docs}\n"));
        }
        out.push_str("\nNeed help? Run: agt --help\n");
        out
    }
}
