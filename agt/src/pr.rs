//! `agt pr`: open a pull request for the checked-out branch.
//!
//! Metadata is gathered first, then the branch is reconciled with the fetched
//! base, then exactly one push and one `gh pr create`. Nothing is pushed when
//! the branch has no commits beyond the base.

use tracing::{debug, info, instrument};

use crate::context::Context;
use crate::core::error::{ClassifiedError, Failure};
use crate::core::types::PullRequestDraft;
use crate::core::validate::validate_not_empty;
use crate::issue::{ask_assignees, ask_labels, ask_optional};
use crate::io::templates::{ContextQuery, fill_placeholders};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestOutcome {
    pub url: String,
    pub head: String,
    pub base: String,
    /// A rebase onto the base ran before the push.
    pub resynced: bool,
}

#[instrument(skip_all)]
pub fn create_pull_request(ctx: &Context<'_>) -> Result<PullRequestOutcome, ClassifiedError> {
    ctx.ensure_environment()?;

    let title = validate_not_empty(
        &ctx.prompter.input("Pull request title", None)?,
        "Pull request title",
    )?;
    let body = ask_pull_request_body(ctx)?;
    let reviewers = ask_optional(ctx, "Reviewers (comma separated, optional)")?;
    let assignees = ask_assignees(ctx)?;
    let labels = ask_labels(ctx)?;
    let milestone = ask_optional(ctx, "Milestone (optional)")?;
    let is_draft = ctx.prompter.confirm("Create as draft?", false)?;
    let base = validate_not_empty(
        &ctx.prompter
            .input("Base branch", Some(ctx.config.default_base_branch.as_str()))?,
        "Base branch",
    )?;

    let git = ctx.git();
    let head = git.current_branch()?;
    let resynced = reconcile(ctx, &head, &base)?;

    let commits = git.commit_count(&base, &head)?;
    if commits == 0 {
        return Err(ClassifiedError::operation_failed(
            Failure::EmptyPullRequest,
            format!("no commits between origin/{base} and {head}"),
        )
        .with_context("base", base)
        .with_context("head", head));
    }
    debug!(commits, head = %head, base = %base, "ready to push");

    git.push_branch(&head)?;
    let draft = PullRequestDraft {
        title,
        body,
        head: head.clone(),
        base: base.clone(),
        reviewers,
        assignees,
        labels,
        milestone,
        is_draft,
    };
    let url = ctx.github().create_pull_request(draft)?;
    info!(url = %url, "pull request created");
    ctx.prompter.show(&format!("Created pull request: {url}"));
    Ok(PullRequestOutcome {
        url,
        head,
        base,
        resynced,
    })
}

/// Show what the template asks for, then fill it. Without a template the body
/// is typed directly.
fn ask_pull_request_body(ctx: &Context<'_>) -> Result<String, ClassifiedError> {
    let template = if ctx.config.auto_templates {
        ctx.templates.pull_request_template()
    } else {
        None
    };
    let Some(template) = template else {
        let body = ctx.prompter.input("Pull request body", None)?;
        return validate_not_empty(&body, "Pull request body");
    };
    if let Some(query) = ctx.templates.pull_request_context() {
        show_context(ctx, query);
    }
    fill_placeholders(&template.contents, ctx.prompter)
}

fn show_context(ctx: &Context<'_>, query: ContextQuery) {
    match query {
        ContextQuery::OpenIssues => match ctx.github().open_issues() {
            Ok(issues) if issues.is_empty() => ctx.prompter.show("No open issues."),
            Ok(issues) => {
                let mut text = String::from("Open issues:");
                for issue in &issues {
                    text.push_str(&format!("\n  {issue}"));
                }
                ctx.prompter.show(&text);
            }
            Err(err) => ctx.note_failure(&err, "list open issues"),
        },
    }
}

/// Check divergence from `origin/<base>` and offer a rebase when behind.
/// A failed check is only a warning; a rebase conflict ends the workflow.
fn reconcile(ctx: &Context<'_>, head: &str, base: &str) -> Result<bool, ClassifiedError> {
    let mut engine = ctx.sync_engine();
    let status = match engine.check_sync(head, base) {
        Ok(status) => status,
        Err(err) => {
            ctx.note_failure(&err, "check sync");
            ctx.prompter.show(&format!(
                "Warning: could not compare {head} with origin/{base}: {}",
                err.message()
            ));
            return Ok(false);
        }
    };
    if status.is_synced {
        return Ok(false);
    }
    ctx.prompter.show(&format!(
        "{head} is {} commit(s) behind origin/{base} and {} ahead.",
        status.behind, status.ahead
    ));
    if !ctx
        .prompter
        .confirm(&format!("Rebase {head} onto origin/{base} now?"), true)?
    {
        return Ok(false);
    }
    engine.resync(base)?;
    ctx.prompter.show(&format!("Rebased onto origin/{base}."));
    Ok(true)
}
