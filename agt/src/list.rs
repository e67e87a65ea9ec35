//! `agt list`: open issues or open pull requests, served from the cache.

use tracing::instrument;

use crate::context::Context;
use crate::core::error::ClassifiedError;
use crate::core::types::{Issue, PullRequestSummary};

#[instrument(skip_all)]
pub fn list_issues(ctx: &Context<'_>) -> Result<Vec<Issue>, ClassifiedError> {
    ctx.ensure_environment()?;
    let issues = ctx.github().open_issues()?;
    show_all(ctx, "open issues", &issues);
    Ok(issues)
}

#[instrument(skip_all)]
pub fn list_pull_requests(ctx: &Context<'_>) -> Result<Vec<PullRequestSummary>, ClassifiedError> {
    ctx.ensure_environment()?;
    let prs = ctx.github().open_pull_requests()?;
    show_all(ctx, "open pull requests", &prs);
    Ok(prs)
}

fn show_all<T: std::fmt::Display>(ctx: &Context<'_>, what: &str, items: &[T]) {
    if items.is_empty() {
        ctx.prompter.show(&format!("No {what}."));
        return;
    }
    let mut text = format!("{} {what}:", items.len());
    for item in items {
        text.push_str(&format!("\n  {item}"));
    }
    ctx.prompter.show(&text);
}
