//! `agt branch`: start a branch for an open issue, or clean up old ones.

use tracing::{info, instrument, warn};

use crate::context::Context;
use crate::core::error::ClassifiedError;
use crate::core::validate::{branch_name, validate_issue_number};
use crate::io::git::is_protected;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// No open issues to branch from.
    NoIssues,
    Created(String),
}

/// Issue, then branch type, then `git checkout -b <type>/<n>-<slug>`.
#[instrument(skip_all)]
pub fn create_branch(ctx: &Context<'_>) -> Result<CreateOutcome, ClassifiedError> {
    ctx.ensure_environment()?;

    let issues = ctx.github().open_issues()?;
    if issues.is_empty() {
        ctx.prompter.show("No open issues found. Create one first with: agt issue");
        return Ok(CreateOutcome::NoIssues);
    }
    let choices: Vec<String> = issues.iter().map(ToString::to_string).collect();
    let issue = &issues[ctx.prompter.select("Issue to work on", &choices)?];
    let number = validate_issue_number(&issue.number)?;

    let types = &ctx.config.branch_types;
    let choices: Vec<String> = types.iter().map(ToString::to_string).collect();
    let branch_type = &types[ctx.prompter.select("Branch type", &choices)?];

    let name = branch_name(&branch_type.name, number, &issue.title)?;
    ctx.git().create_branch(&name)?;
    info!(branch = %name, "branch created");
    ctx.prompter
        .show(&format!("Created and switched to branch: {name}"));
    Ok(CreateOutcome::Created(name))
}

/// Where a branch is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    Local,
    Remote,
    Both,
}

impl DeleteScope {
    const CHOICES: [(&'static str, DeleteScope); 3] = [
        ("Local and remote", DeleteScope::Both),
        ("Local only", DeleteScope::Local),
        ("Remote only", DeleteScope::Remote),
    ];

    fn local(self) -> bool {
        matches!(self, Self::Local | Self::Both)
    }

    fn remote(self) -> bool {
        matches!(self, Self::Remote | Self::Both)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// `local:<branch>` / `remote:<branch>` for each delete that succeeded.
    pub deleted: Vec<String>,
    pub failed: Vec<(String, ClassifiedError)>,
}

/// Delete remote-tracked branches other than the current one and the
/// protected names. Each delete is its own command; a failure is reported and
/// the rest still run.
#[instrument(skip_all)]
pub fn delete_branches(ctx: &Context<'_>) -> Result<DeleteOutcome, ClassifiedError> {
    let git = ctx.git();
    git.ensure_repository()?;

    let current = git.current_branch().ok();
    let candidates: Vec<String> = git
        .remote_branches()?
        .into_iter()
        .filter(|b| Some(b) != current.as_ref() && !is_protected(b))
        .collect();
    if candidates.is_empty() {
        ctx.prompter.show("No branches available to delete.");
        return Ok(DeleteOutcome::default());
    }

    let picked = ctx
        .prompter
        .multi_select("Branches to delete", &candidates, &[])?;
    if picked.is_empty() {
        ctx.prompter.show("No branches selected.");
        return Ok(DeleteOutcome::default());
    }
    let branches: Vec<&String> = picked.iter().filter_map(|i| candidates.get(*i)).collect();

    let labels: Vec<String> = DeleteScope::CHOICES
        .iter()
        .map(|(label, _)| (*label).to_string())
        .collect();
    let scope = DeleteScope::CHOICES[ctx.prompter.select("Delete from", &labels)?].1;

    let listing: Vec<&str> = branches.iter().map(|b| b.as_str()).collect();
    let question = format!(
        "Delete {} branch(es): {}?",
        branches.len(),
        listing.join(", ")
    );
    if !ctx.prompter.confirm(&question, false)? {
        return Err(ClassifiedError::cancelled("branch deletion declined"));
    }

    let mut outcome = DeleteOutcome::default();
    for branch in branches {
        if scope.local() {
            record(ctx, &mut outcome, format!("local:{branch}"), git.delete_local_branch(branch));
        }
        if scope.remote() {
            record(ctx, &mut outcome, format!("remote:{branch}"), git.delete_remote_branch(branch));
        }
    }
    ctx.prompter.show(&format!(
        "Deleted {}, failed {}.",
        outcome.deleted.len(),
        outcome.failed.len()
    ));
    Ok(outcome)
}

fn record(
    ctx: &Context<'_>,
    outcome: &mut DeleteOutcome,
    target: String,
    result: Result<(), ClassifiedError>,
) {
    match result {
        Ok(()) => {
            info!(target = %target, "branch deleted");
            outcome.deleted.push(target);
        }
        Err(err) => {
            warn!(target = %target, kind = %err.kind(), "branch delete failed");
            ctx.note_failure(&err, "delete branch");
            ctx.prompter
                .show(&format!("Could not delete {target}: {}", err.message()));
            outcome.failed.push((target, err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::io::config::AgtConfig;
    use crate::test_support::{ScriptedPrompter, ScriptedRunner, StaticTemplates};

    fn environment() -> ScriptedRunner {
        ScriptedRunner::new()
            .ok(&["git", "rev-parse", "--is-inside-work-tree"], "true")
            .ok(&["gh", "--version"], "gh version 2.40.0")
    }

    #[test]
    fn creates_branch_named_after_issue() {
        let runner = environment()
            .ok(
                &["gh", "issue", "list"],
                "41\tOld thing\t\n42\tFix Login Bug!!\tbug",
            )
            .ok(&["git", "checkout", "-b"], "");
        let prompter = ScriptedPrompter::new().select(1).select(0);
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default());

        let outcome = create_branch(&ctx).expect("branch");
        assert_eq!(
            outcome,
            CreateOutcome::Created("feature/42-fix-login-bug".to_string())
        );
        assert_eq!(runner.count(&["git", "checkout", "-b", "feature/42-fix-login-bug"]), 1);
    }

    #[test]
    fn no_open_issues_is_not_an_error() {
        let runner = environment().ok(&["gh", "issue", "list"], "");
        let prompter = ScriptedPrompter::new();
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default());

        assert_eq!(create_branch(&ctx).expect("branch"), CreateOutcome::NoIssues);
        assert_eq!(runner.count(&["git", "checkout"]), 0);
    }

    #[test]
    fn delete_skips_current_and_protected_and_keeps_going() {
        let runner = ScriptedRunner::new()
            .ok(&["git", "rev-parse", "--is-inside-work-tree"], "true")
            .ok(&["git", "branch", "--show-current"], "feature/1-a")
            .ok(
                &["git", "branch", "--list", "--remotes"],
                "origin/HEAD -> origin/main\norigin/main\norigin/develop\norigin/feature/1-a\norigin/feature/2-b\norigin/fix/3-c",
            )
            .fail(
                &["git", "branch", "-D", "feature/2-b"],
                ErrorKind::CommandFailed,
                "branch 'feature/2-b' not found",
            )
            .ok(&["git", "branch", "-D"], "")
            .ok(&["git", "push", "origin", "--delete"], "");
        // Candidates are feature/2-b and fix/3-c.
        let prompter = ScriptedPrompter::new().multi(&[0, 1]).select(0).confirm(true);
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default());

        let outcome = delete_branches(&ctx).expect("delete");
        assert_eq!(
            outcome.deleted,
            vec!["remote:feature/2-b", "local:fix/3-c", "remote:fix/3-c"]
        );
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "local:feature/2-b");
        assert_eq!(runner.count(&["git", "push", "origin", "--delete"]), 2);
    }

    #[test]
    fn declined_confirmation_deletes_nothing() {
        let runner = ScriptedRunner::new()
            .ok(&["git", "rev-parse", "--is-inside-work-tree"], "true")
            .ok(&["git", "branch", "--show-current"], "main")
            .ok(&["git", "branch", "--list", "--remotes"], "origin/old");
        let prompter = ScriptedPrompter::new().multi(&[0]).select(1).confirm(false);
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default());

        let err = delete_branches(&ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationCancelled);
        assert_eq!(runner.count(&["git", "branch", "-D"]), 0);
    }
}
