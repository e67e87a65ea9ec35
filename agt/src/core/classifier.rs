//! Deterministic classification of raw failures.
//!
//! Structured failures (spawn errors, timeouts, exit codes) are classified by
//! their shape first. Free-form text from `git`/`gh` stderr only reaches the
//! ordered substring rules as a fallback.

use std::io;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::core::error::{ClassifiedError, ErrorKind, Failure, Resource, Tool};

/// A failure before it has been given a kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFailure {
    /// The program could not be started.
    Spawn {
        program: String,
        kind: io::ErrorKind,
        message: String,
    },
    /// The working directory is not a directory, so nothing was started.
    MissingWorkdir { program: String, path: String },
    /// The program ran past its wall-clock ceiling and was killed.
    TimedOut { program: String, after: Duration },
    /// The program exited non-zero (or was killed by a signal: `code == None`).
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    /// stdout was not valid UTF-8.
    Decode { program: String },
    /// Unstructured text from anywhere else.
    Message(String),
}

impl RawFailure {
    fn message(&self) -> String {
        match self {
            Self::Spawn {
                program, message, ..
            } => format!("failed to run {program}: {message}"),
            Self::MissingWorkdir { program, path } => {
                format!("cannot run {program}: {path} is not a directory")
            }
            Self::TimedOut { program, after } => {
                format!("{program} timed out after {}s", after.as_secs())
            }
            Self::Exit {
                program,
                code,
                stderr,
            } => {
                let stderr = stderr.trim();
                let status = code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
                if stderr.is_empty() {
                    format!("{program} exited with {status}")
                } else {
                    format!("{program} exited with {status}: {stderr}")
                }
            }
            Self::Decode { program } => format!("{program} produced output that is not valid UTF-8"),
            Self::Message(text) => text.clone(),
        }
    }
}

/// Map a raw failure onto exactly one error kind. Never fails.
pub fn classify(raw: &RawFailure) -> ClassifiedError {
    let kind = match raw {
        RawFailure::Spawn { program, kind, .. } => {
            if *kind == io::ErrorKind::NotFound {
                ErrorKind::ToolMissing(Tool::from_program(program))
            } else {
                ErrorKind::CommandFailed
            }
        }
        RawFailure::MissingWorkdir { .. } => ErrorKind::RepositoryMissing,
        RawFailure::TimedOut { .. } => ErrorKind::NetworkTimeout,
        RawFailure::Exit { stderr, .. } => {
            classify_text(stderr).unwrap_or(ErrorKind::CommandFailed)
        }
        RawFailure::Decode { .. } => ErrorKind::CommandFailed,
        RawFailure::Message(text) => classify_text(text).unwrap_or(ErrorKind::Unknown),
    };
    let mut err = ClassifiedError::new(kind, raw.message());
    if let RawFailure::Exit {
        code: Some(code), ..
    } = raw
    {
        err = err.with_context("exit_code", code.to_string());
    }
    err
}

/// Shorthand for classifying unstructured text.
pub fn classify_message(text: impl Into<String>) -> ClassifiedError {
    classify(&RawFailure::Message(text.into()))
}

static GH_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bgh\b").unwrap());
static GIT_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bgit\b").unwrap());

/// Ordered text rules; first match wins.
fn classify_text(text: &str) -> Option<ErrorKind> {
    let lower = text.to_lowercase();
    let has = |needle: &str| lower.contains(needle);
    let not_found = has("not found");

    // Rebase output quotes commit subjects, which may mention anything below.
    if has("conflict") && (has("rebase") || has("could not apply")) {
        return Some(ErrorKind::OperationFailed(Failure::RebaseConflict));
    }
    if has("not a git repository") || has("not in a git directory") {
        return Some(ErrorKind::RepositoryMissing);
    }
    if has("command not found") && GH_WORD.is_match(&lower) {
        return Some(ErrorKind::ToolMissing(Some(Tool::Gh)));
    }
    if not_found && GIT_WORD.is_match(&lower) && !has("branch") && !has("ref") {
        return Some(ErrorKind::ToolMissing(Some(Tool::Git)));
    }
    if not_found && GH_WORD.is_match(&lower) {
        return Some(ErrorKind::ToolMissing(Some(Tool::Gh)));
    }
    if has("authentication") || has("not logged in") || has("auth login") {
        return Some(ErrorKind::AuthFailed);
    }
    if has("rate limit") {
        return Some(ErrorKind::NetworkError { rate_limited: true });
    }
    if has("network") || has("enotfound") || has("dns") || has("could not resolve host") {
        return Some(ErrorKind::NetworkError {
            rate_limited: false,
        });
    }
    if has("timeout") || has("timed out") || has("etimedout") {
        return Some(ErrorKind::NetworkTimeout);
    }
    if has("econnrefused") || has("connection refused") {
        return Some(ErrorKind::ConnectionRefused);
    }
    if (has("branch") && not_found) || has("couldn't find remote ref") {
        return Some(ErrorKind::ResourceNotFound(Resource::Branch));
    }
    if (has("issue") && not_found) || has("could not resolve to an issue") {
        return Some(ErrorKind::ResourceNotFound(Resource::Issue));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(text: &str) -> ErrorKind {
        classify_message(text).kind()
    }

    #[test]
    fn rate_limit_is_network_error_variant_in_any_case() {
        for text in [
            "API rate limit exceeded for user",
            "RATE LIMIT reached",
            "secondary Rate Limit",
        ] {
            assert_eq!(
                kind_of(text),
                ErrorKind::NetworkError { rate_limited: true },
                "{text}"
            );
        }
    }

    #[test]
    fn not_a_repository_wins_over_later_rules() {
        assert_eq!(
            kind_of("fatal: not a git repository (or any of the parent directories): .git"),
            ErrorKind::RepositoryMissing
        );
        assert_eq!(
            kind_of("network is down; also not a git repository"),
            ErrorKind::RepositoryMissing
        );
    }

    #[test]
    fn classifies_network_family() {
        assert_eq!(
            kind_of("error connecting to api.github.com: dial tcp: lookup: no such host (dns)"),
            ErrorKind::NetworkError {
                rate_limited: false
            }
        );
        assert!(kind_of("fatal: unable to access: Could not resolve host: github.com").is_transient());
        assert_eq!(kind_of("read: connection timed out"), ErrorKind::NetworkTimeout);
        assert_eq!(kind_of("connect ECONNREFUSED 127.0.0.1:443"), ErrorKind::ConnectionRefused);
    }

    #[test]
    fn classifies_auth_and_tools() {
        assert_eq!(
            kind_of("To get started with GitHub CLI, please run:  gh auth login"),
            ErrorKind::AuthFailed
        );
        assert_eq!(
            kind_of("bash: gh: command not found"),
            ErrorKind::ToolMissing(Some(Tool::Gh))
        );
        assert_eq!(
            kind_of("git: not found"),
            ErrorKind::ToolMissing(Some(Tool::Git))
        );
        assert_eq!(kind_of("high throughput not found"), ErrorKind::Unknown);
    }

    #[test]
    fn classifies_resources_and_conflicts() {
        assert_eq!(
            kind_of("fatal: couldn't find remote ref feature/x"),
            ErrorKind::ResourceNotFound(Resource::Branch)
        );
        assert_eq!(
            kind_of("error: branch 'foo' not found."),
            ErrorKind::ResourceNotFound(Resource::Branch)
        );
        assert_eq!(
            kind_of("GraphQL: Could not resolve to an issue or pull request with the number of 9"),
            ErrorKind::ResourceNotFound(Resource::Issue)
        );
        assert_eq!(
            kind_of("CONFLICT (content): Merge conflict in a.txt\nerror: could not apply 1a2b3c"),
            ErrorKind::OperationFailed(Failure::RebaseConflict)
        );
    }

    #[test]
    fn conflict_wins_over_words_in_the_commit_subject() {
        let err = classify(&RawFailure::Exit {
            program: "git".to_string(),
            code: Some(1),
            stderr: "error: could not apply f36b665... fix network timeout handling\n\
                     hint: Resolve all conflicts manually"
                .to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::OperationFailed(Failure::RebaseConflict));
        assert!(!err.kind().is_transient());
    }

    #[test]
    fn unmatched_message_is_unknown_but_unmatched_exit_is_command_failed() {
        assert_eq!(kind_of("something odd happened"), ErrorKind::Unknown);
        let err = classify(&RawFailure::Exit {
            program: "git".to_string(),
            code: Some(128),
            stderr: "fatal: bad object".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::CommandFailed);
        assert_eq!(err.context().get("exit_code").map(String::as_str), Some("128"));
        assert!(err.message().contains("fatal: bad object"));
    }

    #[test]
    fn structured_failures_classify_by_shape() {
        let spawn = classify(&RawFailure::Spawn {
            program: "gh".to_string(),
            kind: io::ErrorKind::NotFound,
            message: "No such file or directory".to_string(),
        });
        assert_eq!(spawn.kind(), ErrorKind::ToolMissing(Some(Tool::Gh)));

        let denied = classify(&RawFailure::Spawn {
            program: "git".to_string(),
            kind: io::ErrorKind::PermissionDenied,
            message: "denied".to_string(),
        });
        assert_eq!(denied.kind(), ErrorKind::CommandFailed);

        let timeout = classify(&RawFailure::TimedOut {
            program: "gh".to_string(),
            after: Duration::from_secs(60),
        });
        assert_eq!(timeout.kind(), ErrorKind::NetworkTimeout);
        assert_eq!(timeout.message(), "gh timed out after 60s");

        let workdir = classify(&RawFailure::MissingWorkdir {
            program: "git".to_string(),
            path: "/no/such/dir".to_string(),
        });
        assert_eq!(workdir.kind(), ErrorKind::RepositoryMissing);
        assert!(workdir.message().contains("/no/such/dir"));

        let decode = classify(&RawFailure::Decode {
            program: "git".to_string(),
        });
        assert_eq!(decode.kind(), ErrorKind::CommandFailed);
    }

    #[test]
    fn classification_is_deterministic() {
        let raw = RawFailure::Message("HTTP 403: API rate limit exceeded".to_string());
        assert_eq!(classify(&raw), classify(&raw));
        assert!(classify(&raw).kind().is_transient());
    }
}
