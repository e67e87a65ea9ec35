//! `agt search`: issues or pull requests matching a query.

use tracing::instrument;

use crate::context::Context;
use crate::core::error::ClassifiedError;
use crate::core::types::SearchHit;
use crate::core::validate::validate_not_empty;
use crate::io::github::SearchFilters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    Issues,
    PullRequests,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub target: SearchTarget,
    pub filters: SearchFilters,
}

/// Retried on transient failures, never cached.
#[instrument(skip_all, fields(query = %request.query))]
pub fn search(ctx: &Context<'_>, request: &SearchRequest) -> Result<Vec<SearchHit>, ClassifiedError> {
    let query = validate_not_empty(&request.query, "Search query")?;
    ctx.ensure_environment()?;
    let github = ctx.github();
    let hits = match request.target {
        SearchTarget::Issues => github.search_issues(&query, &request.filters)?,
        SearchTarget::PullRequests => github.search_pull_requests(&query, &request.filters)?,
    };
    if hits.is_empty() {
        ctx.prompter.show(&format!("No results for '{query}'."));
    } else {
        let mut text = format!("{} result(s) for '{query}':", hits.len());
        for hit in &hits {
            text.push_str(&format!("\n  {hit}"));
        }
        ctx.prompter.show(&text);
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::error::{ErrorKind, InvalidInput};
    use crate::core::retry::RetryPolicy;
    use crate::io::config::AgtConfig;
    use crate::test_support::{ScriptedPrompter, ScriptedRunner, StaticTemplates};

    fn environment() -> ScriptedRunner {
        ScriptedRunner::new()
            .ok(&["git", "rev-parse", "--is-inside-work-tree"], "true")
            .ok(&["gh", "--version"], "gh version 2.40.0")
    }

    #[test]
    fn transient_failure_is_retried_and_results_shown() {
        let runner = environment()
            .fail_once(&["gh", "issue", "list"], ErrorKind::NetworkTimeout, "timed out")
            .ok(
                &["gh", "issue", "list"],
                r#"[{"number":3,"title":"Login bug","state":"OPEN","author":{"login":"bob"},"labels":[]}]"#,
            );
        let prompter = ScriptedPrompter::new();
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default())
            .with_retry(RetryPolicy::new(3, Duration::ZERO));

        let request = SearchRequest {
            query: "login".to_string(),
            target: SearchTarget::Issues,
            filters: SearchFilters {
                author: Some("bob".to_string()),
                ..SearchFilters::default()
            },
        };
        let hits = search(&ctx, &request).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(runner.count(&["gh", "issue", "list"]), 2);
        assert!(prompter.shown()[0].contains("#3 Login bug (OPEN, @bob)"));

        search(&ctx, &request).expect("search again");
        assert_eq!(runner.count(&["gh", "issue", "list"]), 3);
    }

    #[test]
    fn blank_query_is_rejected_up_front() {
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::new();
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default());

        let request = SearchRequest {
            query: "  ".to_string(),
            target: SearchTarget::PullRequests,
            filters: SearchFilters::default(),
        };
        let err = search(&ctx, &request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput(InvalidInput::EmptyField));
        assert!(runner.calls().is_empty());
    }
}
