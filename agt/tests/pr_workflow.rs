//! Branch and pull request workflows with real `git` and a scripted `gh`.

use std::time::Duration;

use agt::branch::{CreateOutcome, create_branch};
use agt::context::Context;
use agt::core::error::{ClassifiedError, ErrorKind, Failure};
use agt::core::retry::RetryPolicy;
use agt::core::types::{CommandResult, CommandSpec};
use agt::io::config::AgtConfig;
use agt::io::runner::{CommandRunner, ProcessRunner};
use agt::pr::create_pull_request;
use agt::test_support::{ScriptedPrompter, ScriptedRunner, StaticTemplates, TestRepo};

/// `git` runs for real in the test repository; `gh` is scripted.
struct SplitRunner {
    git: ProcessRunner,
    gh: ScriptedRunner,
}

impl CommandRunner for SplitRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ClassifiedError> {
        if spec.program() == "gh" {
            self.gh.run(spec)
        } else {
            self.git.run(spec)
        }
    }
}

fn gh() -> ScriptedRunner {
    ScriptedRunner::new()
        .ok(&["gh", "--version"], "gh version 2.40.0")
        .ok(&["gh", "label", "list"], "")
        .ok(&["gh", "pr", "create"], "https://github.com/o/r/pull/1")
}

fn config() -> AgtConfig {
    AgtConfig {
        auto_assign: false,
        ..AgtConfig::default()
    }
}

/// title, body, reviewers, assignees, milestone, draft, base.
fn pr_answers(title: &str) -> ScriptedPrompter {
    ScriptedPrompter::new()
        .text(title)
        .text("body")
        .text("")
        .text("")
        .text("")
        .confirm(false)
        .text("")
}

fn remote_has_branch(repo: &TestRepo, branch: &str) -> bool {
    !repo
        .git(&["ls-remote", "--heads", "origin", branch])
        .expect("ls-remote")
        .is_empty()
}

#[test]
fn branch_without_commits_is_never_pushed() {
    let repo = TestRepo::new().expect("repo");
    repo.git(&["checkout", "-q", "-b", "feature/5-empty"]).expect("checkout");

    let runner = SplitRunner {
        git: ProcessRunner::new(repo.root()),
        gh: gh(),
    };
    let prompter = pr_answers("Empty");
    let templates = StaticTemplates::none();
    let ctx = Context::new(&runner, &prompter, &templates, config())
        .with_retry(RetryPolicy::new(1, Duration::ZERO));

    let err = create_pull_request(&ctx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationFailed(Failure::EmptyPullRequest));
    assert!(!remote_has_branch(&repo, "feature/5-empty"));
    assert_eq!(runner.gh.count(&["gh", "pr", "create"]), 0);
}

#[test]
fn issue_to_branch_to_pull_request() {
    let repo = TestRepo::new().expect("repo");
    let runner = SplitRunner {
        git: ProcessRunner::new(repo.root()),
        gh: gh().ok(&["gh", "issue", "list"], "42\tFix Login Bug!!\tbug"),
    };
    let templates = StaticTemplates::none();

    let prompter = ScriptedPrompter::new().select(0).select(0);
    let ctx = Context::new(&runner, &prompter, &templates, config());
    let created = create_branch(&ctx).expect("branch");
    assert_eq!(
        created,
        CreateOutcome::Created("feature/42-fix-login-bug".to_string())
    );
    assert_eq!(
        repo.git(&["branch", "--show-current"]).expect("current"),
        "feature/42-fix-login-bug"
    );

    repo.commit_file("login.rs", "fn login() {}\n", "fix: login").expect("commit");
    let prompter = pr_answers("Fix login");
    let ctx = Context::new(&runner, &prompter, &templates, config());
    let outcome = create_pull_request(&ctx).expect("pr");

    assert_eq!(outcome.head, "feature/42-fix-login-bug");
    assert_eq!(outcome.base, "main");
    assert!(!outcome.resynced);
    assert!(remote_has_branch(&repo, "feature/42-fix-login-bug"));
    assert_eq!(runner.gh.count(&["gh", "pr", "create"]), 1);
    let create = runner
        .gh
        .calls()
        .into_iter()
        .find(|c| c.starts_with(&["pr", "create"]))
        .expect("create");
    assert!(create.starts_with(&[
        "pr",
        "create",
        "--title",
        "Fix login",
        "--body",
        "body",
        "--head",
        "feature/42-fix-login-bug",
        "--base",
        "main",
    ]));
}

#[test]
fn behind_branch_is_rebased_before_push() {
    let repo = TestRepo::new().expect("repo");
    repo.git(&["checkout", "-q", "-b", "feature/7-behind"]).expect("checkout");
    repo.commit_file("mine.txt", "mine", "feat: mine").expect("commit");
    repo.advance_origin("main", "theirs.txt", "theirs").expect("advance");

    let runner = SplitRunner {
        git: ProcessRunner::new(repo.root()),
        gh: gh(),
    };
    let prompter = pr_answers("Behind").confirm(true);
    let templates = StaticTemplates::none();
    let ctx = Context::new(&runner, &prompter, &templates, config());

    let outcome = create_pull_request(&ctx).expect("pr");
    assert!(outcome.resynced);
    assert!(remote_has_branch(&repo, "feature/7-behind"));
    repo.git(&["merge-base", "--is-ancestor", "origin/main", "origin/feature/7-behind"])
        .expect("pushed branch contains the new base");
    assert_eq!(prompter.remaining(), 0);
}
