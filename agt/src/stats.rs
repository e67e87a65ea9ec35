//! `agt stats`: repository counters and top contributors, printed as read.

use tracing::instrument;

use crate::context::Context;
use crate::core::error::ClassifiedError;
use crate::core::types::{Contributor, RepoSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStats {
    pub summary: RepoSummary,
    /// Empty when the contributor list could not be read.
    pub contributors: Vec<Contributor>,
}

#[instrument(skip_all)]
pub fn show_stats(ctx: &Context<'_>) -> Result<RepoStats, ClassifiedError> {
    ctx.ensure_environment()?;
    let github = ctx.github();
    let summary = github.repo_summary()?;
    let contributors = github.contributors().unwrap_or_else(|err| {
        ctx.note_failure(&err, "list contributors");
        Vec::new()
    });

    let mut text = format!(
        "{}\n  Stars: {}\n  Forks: {}\n  Watchers: {}\n  Issues: {}\n  Pull requests: {}",
        summary.name_with_owner,
        summary.stargazer_count,
        summary.fork_count,
        summary.watchers,
        summary.issues,
        summary.pull_requests,
    );
    if !contributors.is_empty() {
        text.push_str("\nTop contributors:");
        for c in &contributors {
            text.push_str(&format!("\n  {} ({})", c.login, c.contributions));
        }
    }
    ctx.prompter.show(&text);
    Ok(RepoStats {
        summary,
        contributors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::io::config::AgtConfig;
    use crate::test_support::{ScriptedPrompter, ScriptedRunner, StaticTemplates};

    const REPO_JSON: &str = r#"{"nameWithOwner":"o/r","stargazerCount":12,"forkCount":3,"watchers":{"totalCount":4},"issues":{"totalCount":5},"pullRequests":{"totalCount":6}}"#;

    #[test]
    fn prints_summary_and_contributors() {
        let runner = ScriptedRunner::new()
            .ok(&["git", "rev-parse", "--is-inside-work-tree"], "true")
            .ok(&["gh", "--version"], "gh version 2.40.0")
            .ok(&["gh", "repo", "view"], REPO_JSON)
            .ok(&["gh", "api"], "alice\t30\nbob\t4");
        let prompter = ScriptedPrompter::new();
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default());

        let stats = show_stats(&ctx).expect("stats");
        assert_eq!(stats.summary.stargazer_count, 12);
        assert_eq!(stats.summary.watchers, 4);
        assert_eq!(stats.contributors.len(), 2);
        let shown = &prompter.shown()[0];
        assert!(shown.starts_with("o/r\n  Stars: 12"));
        assert!(shown.contains("alice (30)"));

        show_stats(&ctx).expect("cached");
        assert_eq!(runner.count(&["gh", "repo", "view"]), 1);
        assert_eq!(runner.count(&["gh", "api"]), 1);
    }

    #[test]
    fn contributor_failure_is_not_fatal() {
        let runner = ScriptedRunner::new()
            .ok(&["git", "rev-parse", "--is-inside-work-tree"], "true")
            .ok(&["gh", "--version"], "gh version 2.40.0")
            .ok(&["gh", "repo", "view"], REPO_JSON)
            .fail(&["gh", "api"], ErrorKind::AuthFailed, "HTTP 401");
        let prompter = ScriptedPrompter::new();
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default());

        let stats = show_stats(&ctx).expect("stats");
        assert!(stats.contributors.is_empty());
        assert!(!prompter.shown()[0].contains("Top contributors"));
    }
}
