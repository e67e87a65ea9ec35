//! `agt issue`: create an issue through `gh issue create`.
//!
//! Also home of the metadata prompts (assignees, labels, milestone) that the
//! pull request workflow asks in the same way.

use std::collections::BTreeSet;

use tracing::{debug, info, instrument};

use crate::context::Context;
use crate::core::error::ClassifiedError;
use crate::core::types::IssueDraft;
use crate::core::validate::validate_not_empty;
use crate::io::templates::fill_placeholders;

const BLANK_TEMPLATE: &str = "Blank issue";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOutcome {
    pub url: String,
}

#[instrument(skip_all)]
pub fn create_issue(ctx: &Context<'_>) -> Result<IssueOutcome, ClassifiedError> {
    ctx.ensure_environment()?;

    let title = validate_not_empty(&ctx.prompter.input("Issue title", None)?, "Issue title")?;
    let body = ask_issue_body(ctx)?;
    let assignees = ask_assignees(ctx)?;
    let labels = ask_labels(ctx)?;
    let milestone = ask_optional(ctx, "Milestone (optional)")?;

    let draft = IssueDraft {
        title,
        body,
        assignees,
        labels,
        milestone,
    };
    debug!(?draft, "creating issue");
    let url = ctx.github().create_issue(draft)?;
    info!(url = %url, "issue created");
    ctx.prompter.show(&format!("Created issue: {url}"));
    Ok(IssueOutcome { url })
}

fn ask_issue_body(ctx: &Context<'_>) -> Result<String, ClassifiedError> {
    let templates = if ctx.config.auto_templates {
        ctx.templates.issue_templates()
    } else {
        Vec::new()
    };
    if templates.is_empty() {
        return ctx.prompter.input("Issue body", Some(""));
    }
    let mut choices: Vec<String> = templates.iter().map(|t| t.name.clone()).collect();
    choices.push(BLANK_TEMPLATE.to_string());
    let picked = ctx.prompter.select("Issue template", &choices)?;
    match templates.get(picked) {
        Some(template) => fill_placeholders(&template.contents, ctx.prompter),
        None => ctx.prompter.input("Issue body", Some("")),
    }
}

/// Free text, `None` when left empty.
pub(crate) fn ask_optional(
    ctx: &Context<'_>,
    message: &str,
) -> Result<Option<String>, ClassifiedError> {
    let answer = ctx.prompter.input(message, Some(""))?;
    Ok(Some(answer.trim().to_string()).filter(|a| !a.is_empty()))
}

/// Whatever is typed. With `autoAssign` on, an empty answer means the
/// current user.
pub(crate) fn ask_assignees(ctx: &Context<'_>) -> Result<Option<String>, ClassifiedError> {
    if !ctx.config.auto_assign {
        return ask_optional(ctx, "Assignees (comma separated, optional)");
    }
    if let Some(typed) = ask_optional(ctx, "Assignees (comma separated, empty for yourself)")? {
        return Ok(Some(typed));
    }
    match ctx.github().current_user() {
        Ok(login) if !login.trim().is_empty() => Ok(Some(login.trim().to_string())),
        Ok(_) => Ok(Some("@me".to_string())),
        Err(err) => {
            ctx.note_failure(&err, "current user");
            Ok(Some("@me".to_string()))
        }
    }
}

/// Pick from the repository's labels, `defaultLabels` preselected. An
/// unreadable label list skips the question.
pub(crate) fn ask_labels(ctx: &Context<'_>) -> Result<BTreeSet<String>, ClassifiedError> {
    let available = match ctx.github().labels() {
        Ok(labels) => labels,
        Err(err) => {
            ctx.note_failure(&err, "list labels");
            ctx.prompter
                .show(&format!("Could not load labels, skipping: {}", err.message()));
            return Ok(BTreeSet::new());
        }
    };
    if available.is_empty() {
        return Ok(BTreeSet::new());
    }
    let preselected: Vec<usize> = available
        .iter()
        .enumerate()
        .filter(|(_, name)| ctx.config.default_labels.contains(name))
        .map(|(index, _)| index)
        .collect();
    let picked = ctx
        .prompter
        .multi_select("Labels", &available, &preselected)?;
    Ok(picked
        .into_iter()
        .filter_map(|index| available.get(index).cloned())
        .collect())
}
