//! Typed `git` calls.
//!
//! Each method builds one [`CommandSpec`] and hands it to the runner. Nothing
//! here is cached: local git reads are cheap and the sync checks must always
//! see fresh state.

use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::core::error::{ClassifiedError, ErrorKind, Resource};
use crate::core::types::{BranchSyncStatus, CommandSpec, parse_divergence};
use crate::io::runner::CommandRunner;

pub const REMOTE: &str = "origin";

/// Branches the delete workflow never offers.
pub const PROTECTED_BRANCHES: &[&str] = &[
    "main",
    "master",
    "develop",
    "development",
    "staging",
    "production",
    "release",
];

pub fn is_protected(branch: &str) -> bool {
    PROTECTED_BRANCHES.contains(&branch)
}

/// `origin/<branch>`.
pub fn remote_ref(branch: &str) -> String {
    format!("{REMOTE}/{branch}")
}

#[derive(Clone, Copy)]
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    fn run(&self, args: &[&str]) -> Result<String, ClassifiedError> {
        Ok(self.runner.run(&CommandSpec::git(args.iter().copied()))?.stdout)
    }

    /// Fails with repository-missing unless the working directory is inside a
    /// work tree. A missing `git` stays tool-missing.
    #[instrument(skip_all)]
    pub fn ensure_repository(&self) -> Result<(), ClassifiedError> {
        match self.run(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(out) if out.trim() == "true" => Ok(()),
            Ok(out) => Err(ClassifiedError::new(
                ErrorKind::RepositoryMissing,
                format!("not inside a work tree (rev-parse said '{out}')"),
            )),
            Err(err) if matches!(err.kind(), ErrorKind::ToolMissing(_)) => Err(err),
            Err(err) => Err(ClassifiedError::new(
                ErrorKind::RepositoryMissing,
                err.message().to_string(),
            )),
        }
    }

    /// Name of the checked-out branch. Detached HEAD is an error.
    pub fn current_branch(&self) -> Result<String, ClassifiedError> {
        let name = self.run(&["branch", "--show-current"])?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ClassifiedError::new(
                ErrorKind::ResourceNotFound(Resource::Branch),
                "HEAD is detached; check out a branch first",
            ));
        }
        debug!(branch = name, "current branch");
        Ok(name.to_string())
    }

    /// Remote-tracking branches with the `origin/` prefix removed, `HEAD`
    /// pointers dropped.
    pub fn remote_branches(&self) -> Result<Vec<String>, ClassifiedError> {
        let out = self.run(&["branch", "--list", "--remotes"])?;
        let prefix = format!("{REMOTE}/");
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.contains("->"))
            .map(|line| line.strip_prefix(&prefix).unwrap_or(line).to_string())
            .filter(|branch| branch != "HEAD")
            .collect())
    }

    /// Commits on `head` not on the fetched `base`.
    pub fn commit_count(&self, base: &str, head: &str) -> Result<u32, ClassifiedError> {
        let range = format!("{}..{head}", remote_ref(base));
        let out = self.run(&["rev-list", "--count", &range])?;
        out.trim().parse().map_err(|_| {
            ClassifiedError::new(
                ErrorKind::CommandFailed,
                format!("unexpected rev-list output '{out}'"),
            )
            .with_context("range", range)
        })
    }

    #[instrument(skip_all, fields(branch))]
    pub fn create_branch(&self, branch: &str) -> Result<(), ClassifiedError> {
        self.run(&["checkout", "-b", branch]).map(drop)
    }

    #[instrument(skip_all, fields(branch))]
    pub fn push_branch(&self, branch: &str) -> Result<(), ClassifiedError> {
        self.run(&["push", "-u", REMOTE, branch]).map(drop)
    }

    pub fn delete_local_branch(&self, branch: &str) -> Result<(), ClassifiedError> {
        self.run(&["branch", "-D", branch]).map(drop)
    }

    pub fn delete_remote_branch(&self, branch: &str) -> Result<(), ClassifiedError> {
        self.run(&["push", REMOTE, "--delete", branch]).map(drop)
    }

    #[instrument(skip_all, fields(base))]
    pub fn fetch(&self, base: &str) -> Result<(), ClassifiedError> {
        self.run(&["fetch", REMOTE, base]).map(drop)
    }

    /// Behind/ahead counts of `local` relative to `origin/<base>`.
    pub fn divergence(&self, base: &str, local: &str) -> Result<BranchSyncStatus, ClassifiedError> {
        let range = format!("{}...{local}", remote_ref(base));
        let out = self.run(&["rev-list", "--left-right", "--count", &range])?;
        parse_divergence(&out).ok_or_else(|| {
            ClassifiedError::new(
                ErrorKind::CommandFailed,
                format!("unexpected rev-list output '{out}'"),
            )
            .with_context("range", range)
        })
    }

    /// Rebase the checked-out branch onto `origin/<base>`.
    #[instrument(skip_all, fields(base))]
    pub fn rebase_onto(&self, base: &str) -> Result<(), ClassifiedError> {
        self.run(&["rebase", &remote_ref(base)]).map(drop)
    }

    /// Whether a stopped rebase is waiting in the git directory.
    pub fn rebase_in_progress(&self) -> Result<bool, ClassifiedError> {
        let dir = PathBuf::from(self.run(&["rev-parse", "--absolute-git-dir"])?.trim());
        Ok(dir.join("rebase-merge").is_dir() || dir.join("rebase-apply").is_dir())
    }
}
