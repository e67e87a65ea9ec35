//! Typed `gh` calls.
//!
//! Reads go through the TTL cache with the retry policy inside the producer;
//! search reads are retried but not cached. Mutations are exactly one runner
//! call each, never retried, and invalidate the cached read they change.

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::core::error::{ClassifiedError, ErrorKind, Tool};
use crate::core::retry::RetryPolicy;
use crate::core::types::{
    CommandSpec, Contributor, Issue, IssueDraft, LabelDraft, PullRequestDraft,
    PullRequestSummary, RepoSummary, SearchHit,
};
use crate::io::cache::{ReadKind, TtlCache};
use crate::io::runner::CommandRunner;

/// Optional filters for issue/PR search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// `open`, `closed`, `merged` or `all`; passed through to `gh`.
    pub state: Option<String>,
    pub author: Option<String>,
    /// Issues only; `gh pr list` searches ignore it.
    pub label: Option<String>,
}

#[derive(Clone, Copy)]
pub struct GitHub<'a> {
    runner: &'a dyn CommandRunner,
    cache: &'a TtlCache,
    retry: RetryPolicy,
}

impl<'a> GitHub<'a> {
    pub fn new(runner: &'a dyn CommandRunner, cache: &'a TtlCache, retry: RetryPolicy) -> Self {
        Self {
            runner,
            cache,
            retry,
        }
    }

    fn read(&self, args: Vec<String>) -> Result<String, ClassifiedError> {
        let spec = CommandSpec::gh(args);
        self.retry
            .with_retry(|| self.runner.run(&spec))
            .map(|out| out.stdout)
    }

    fn cached<T>(
        &self,
        kind: ReadKind,
        args: Vec<String>,
        parse: impl FnOnce(&str) -> Result<T, ClassifiedError>,
    ) -> Result<T, ClassifiedError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.cache
            .get_or_compute(kind.key(), kind.ttl(), || parse(&self.read(args)?))
    }

    fn run_once(&self, spec: &CommandSpec) -> Result<String, ClassifiedError> {
        Ok(self.runner.run(spec)?.stdout)
    }

    /// `gh --version`. Any failure means the tool is unusable.
    #[instrument(skip_all)]
    pub fn ensure_installed(&self) -> Result<(), ClassifiedError> {
        match self.runner.run(&CommandSpec::gh(["--version"])) {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.kind(), ErrorKind::ToolMissing(_)) => Err(err),
            Err(err) => Err(ClassifiedError::new(
                ErrorKind::ToolMissing(Some(Tool::Gh)),
                err.message().to_string(),
            )),
        }
    }

    /// `gh auth status` output (gh writes it to stderr, so this is usually
    /// empty on success).
    pub fn auth_status(&self) -> Result<String, ClassifiedError> {
        self.run_once(&CommandSpec::gh(["auth", "status"]))
    }

    pub fn current_user(&self) -> Result<String, ClassifiedError> {
        self.read(args(["api", "user", "-q", ".login"]))
    }

    pub fn labels(&self) -> Result<Vec<String>, ClassifiedError> {
        self.cached(
            ReadKind::Labels,
            args(["label", "list", "--json", "name", "-q", ".[] | .name"]),
            |out| Ok(non_empty_lines(out).map(|l| l.trim().to_string()).collect()),
        )
    }

    pub fn open_issues(&self) -> Result<Vec<Issue>, ClassifiedError> {
        self.cached(
            ReadKind::OpenIssues,
            args([
                "issue",
                "list",
                "--state",
                "open",
                "--json",
                "number,title,labels",
                "-q",
                ".[] | [.number, .title, .labels[0].name] | @tsv",
            ]),
            |out| Ok(non_empty_lines(out).filter_map(Issue::from_tsv).collect()),
        )
    }

    pub fn open_pull_requests(&self) -> Result<Vec<PullRequestSummary>, ClassifiedError> {
        self.cached(
            ReadKind::OpenPullRequests,
            args([
                "pr",
                "list",
                "--state",
                "open",
                "--json",
                "number,title,headRefName,isDraft",
                "-q",
                ".[] | [.number, .title, .headRefName, .isDraft] | @tsv",
            ]),
            |out| {
                Ok(non_empty_lines(out)
                    .filter_map(PullRequestSummary::from_tsv)
                    .collect())
            },
        )
    }

    pub fn repo_summary(&self) -> Result<RepoSummary, ClassifiedError> {
        self.cached(
            ReadKind::RepoStats,
            args([
                "repo",
                "view",
                "--json",
                "nameWithOwner,stargazerCount,forkCount,watchers,issues,pullRequests",
            ]),
            |out| decode_json(out, "repo view"),
        )
    }

    pub fn contributors(&self) -> Result<Vec<Contributor>, ClassifiedError> {
        self.cached(
            ReadKind::Contributors,
            args([
                "api",
                "repos/{owner}/{repo}/contributors?per_page=10",
                "-q",
                ".[] | [.login, .contributions] | @tsv",
            ]),
            |out| Ok(non_empty_lines(out).filter_map(Contributor::from_tsv).collect()),
        )
    }

    #[instrument(skip_all, fields(query = %query))]
    pub fn search_issues(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, ClassifiedError> {
        let search = search_string(query, filters, true);
        let mut argv = args(["issue", "list", "--search"]);
        argv.push(search);
        argv.extend(args(["--json", "number,title,labels,author,state"]));
        push_state(&mut argv, filters);
        let out = self.read(argv)?;
        decode_json_list(&out, "issue search")
    }

    #[instrument(skip_all, fields(query = %query))]
    pub fn search_pull_requests(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, ClassifiedError> {
        let search = search_string(query, filters, false);
        let mut argv = args(["pr", "list", "--search"]);
        argv.push(search);
        argv.extend(args(["--json", "number,title,labels,author,state"]));
        push_state(&mut argv, filters);
        let out = self.read(argv)?;
        decode_json_list(&out, "pull request search")
    }

    /// Returns the new issue's URL.
    pub fn create_issue(&self, draft: IssueDraft) -> Result<String, ClassifiedError> {
        let url = self.run_once(&draft.into_command())?;
        self.cache.invalidate(ReadKind::OpenIssues.key());
        Ok(url)
    }

    /// Returns the new pull request's URL.
    pub fn create_pull_request(&self, draft: PullRequestDraft) -> Result<String, ClassifiedError> {
        let url = self.run_once(&draft.into_command())?;
        self.cache.invalidate(ReadKind::OpenPullRequests.key());
        Ok(url)
    }

    pub fn create_label(&self, draft: LabelDraft) -> Result<(), ClassifiedError> {
        self.run_once(&draft.into_command())?;
        self.cache.invalidate(ReadKind::Labels.key());
        Ok(())
    }
}

fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn non_empty_lines(out: &str) -> impl Iterator<Item = &str> {
    out.lines().filter(|line| !line.trim().is_empty())
}

fn search_string(query: &str, filters: &SearchFilters, with_label: bool) -> String {
    let mut search = query.trim().to_string();
    if with_label && let Some(label) = filters.label.as_deref().filter(|l| !l.is_empty()) {
        search.push_str(&format!(" label:{label}"));
    }
    if let Some(author) = filters.author.as_deref().filter(|a| !a.is_empty()) {
        search.push_str(&format!(" author:{author}"));
    }
    search.trim().to_string()
}

fn push_state(argv: &mut Vec<String>, filters: &SearchFilters) {
    if let Some(state) = filters.state.as_deref().filter(|s| !s.is_empty()) {
        argv.push("--state".to_string());
        argv.push(state.to_string());
    }
}

fn decode_json<T: DeserializeOwned>(out: &str, what: &str) -> Result<T, ClassifiedError> {
    serde_json::from_str(out).map_err(|err| {
        debug!(err = %err, what, "undecodable gh output");
        ClassifiedError::new(
            ErrorKind::CommandFailed,
            format!("could not parse {what} output: {err}"),
        )
    })
}

fn decode_json_list<T: DeserializeOwned>(out: &str, what: &str) -> Result<Vec<T>, ClassifiedError> {
    if out.trim().is_empty() {
        return Ok(Vec::new());
    }
    decode_json(out, what)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;
    use std::time::Duration;

    fn quick_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[test]
    fn labels_are_cached_between_calls() {
        let runner = ScriptedRunner::new().ok(&["gh", "label", "list"], "bug\nenhancement\n");
        let cache = TtlCache::new();
        let gh = GitHub::new(&runner, &cache, quick_retry());

        assert_eq!(gh.labels().unwrap(), vec!["bug", "enhancement"]);
        assert_eq!(gh.labels().unwrap(), vec!["bug", "enhancement"]);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn transient_read_failure_is_retried_inside_producer() {
        let runner = ScriptedRunner::new()
            .fail_once(
                &["gh", "issue", "list"],
                ErrorKind::NetworkTimeout,
                "timed out",
            )
            .ok(&["gh", "issue", "list"], "1\tFix login\tbug\n2\tDocs\t\n");
        let cache = TtlCache::new();
        let gh = GitHub::new(&runner, &cache, quick_retry());

        let issues = gh.open_issues().unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].label, "none");
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn failed_read_is_not_cached() {
        let runner = ScriptedRunner::new()
            .fail_once(&["gh", "label", "list"], ErrorKind::AuthFailed, "auth login")
            .ok(&["gh", "label", "list"], "bug");
        let cache = TtlCache::new();
        let gh = GitHub::new(&runner, &cache, quick_retry());

        assert_eq!(gh.labels().unwrap_err().kind(), ErrorKind::AuthFailed);
        assert_eq!(runner.calls().len(), 1, "auth failures are not retried");
        assert_eq!(gh.labels().unwrap(), vec!["bug"]);
    }

    #[test]
    fn creating_a_label_invalidates_the_label_list() {
        let runner = ScriptedRunner::new()
            .ok(&["gh", "label", "list"], "bug")
            .ok(&["gh", "label", "create"], "");
        let cache = TtlCache::new();
        let gh = GitHub::new(&runner, &cache, quick_retry());

        gh.labels().unwrap();
        let draft = crate::core::validate::label_draft("ui", "#00ff00", "").unwrap();
        gh.create_label(draft).unwrap();
        gh.labels().unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].args(), ["label", "create", "ui", "--color", "00FF00"]);
        assert!(calls[2].starts_with(&["label", "list"]));
    }

    #[test]
    fn mutation_failures_are_not_retried() {
        let runner = ScriptedRunner::new().fail(
            &["gh", "issue", "create"],
            ErrorKind::NetworkError {
                rate_limited: false,
            },
            "network unreachable",
        );
        let cache = TtlCache::new();
        let gh = GitHub::new(&runner, &cache, quick_retry());
        let draft = IssueDraft {
            title: "t".to_string(),
            body: "b".to_string(),
            ..IssueDraft::default()
        };

        assert!(gh.create_issue(draft).is_err());
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn search_combines_filters() {
        let runner = ScriptedRunner::new().ok(
            &["gh", "issue", "list", "--search"],
            r#"[{"number":3,"title":"Crash","state":"OPEN","author":{"login":"kim"},"labels":[{"name":"bug"}]}]"#,
        );
        let cache = TtlCache::new();
        let gh = GitHub::new(&runner, &cache, quick_retry());
        let filters = SearchFilters {
            state: Some("all".to_string()),
            author: Some("kim".to_string()),
            label: Some("bug".to_string()),
        };

        let hits = gh.search_issues("crash", &filters).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].author, "kim");
        assert_eq!(hits[0].labels, vec!["bug"]);
        assert_eq!(
            runner.calls()[0].args(),
            [
                "issue",
                "list",
                "--search",
                "crash label:bug author:kim",
                "--json",
                "number,title,labels,author,state",
                "--state",
                "all",
            ]
        );
        assert!(cache.is_empty(), "search results are not cached");
    }

    #[test]
    fn gh_failure_on_version_is_tool_missing() {
        let runner = ScriptedRunner::new().fail(
            &["gh", "--version"],
            ErrorKind::CommandFailed,
            "weird",
        );
        let cache = TtlCache::new();
        let gh = GitHub::new(&runner, &cache, quick_retry());
        assert_eq!(
            gh.ensure_installed().unwrap_err().kind(),
            ErrorKind::ToolMissing(Some(Tool::Gh))
        );
    }
}
