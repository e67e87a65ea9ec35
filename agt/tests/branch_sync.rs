//! Branch reconciliation against real repositories with a bare `origin`.

use agt::core::error::{ErrorKind, Failure};
use agt::core::types::BranchSyncStatus;
use agt::io::git::Git;
use agt::io::runner::ProcessRunner;
use agt::io::sync::{BranchSyncEngine, SyncState};
use agt::test_support::TestRepo;

fn feature_branch(repo: &TestRepo, name: &str, commits: &[(&str, &str)]) {
    repo.git(&["checkout", "-q", "-b", name]).expect("checkout");
    for (file, contents) in commits {
        repo.commit_file(file, contents, &format!("feat: {file}"))
            .expect("commit");
    }
}

#[test]
fn ahead_only_counts_as_synced() {
    let repo = TestRepo::new().expect("repo");
    feature_branch(&repo, "feature/1-x", &[("a.txt", "a"), ("b.txt", "b")]);

    let runner = ProcessRunner::new(repo.root());
    let mut engine = BranchSyncEngine::new(Git::new(&runner));
    let status = engine.check_sync("feature/1-x", "main").expect("check");

    assert_eq!(status, BranchSyncStatus::new(0, 2));
    assert!(status.is_synced);
    assert_eq!(engine.state(), SyncState::Synced(status));
    assert_eq!(Git::new(&runner).commit_count("main", "feature/1-x").expect("count"), 2);
}

#[test]
fn behind_then_resync_catches_up() {
    let repo = TestRepo::new().expect("repo");
    feature_branch(&repo, "feature/2-y", &[("mine.txt", "mine")]);
    repo.advance_origin("main", "theirs.txt", "theirs").expect("advance");

    let runner = ProcessRunner::new(repo.root());
    let mut engine = BranchSyncEngine::new(Git::new(&runner));
    let status = engine.check_sync("feature/2-y", "main").expect("check");
    assert_eq!(status, BranchSyncStatus::new(1, 1));
    assert!(matches!(engine.state(), SyncState::Diverged(_)));

    engine.resync("main").expect("resync");
    assert_eq!(engine.state(), SyncState::Unknown);
    assert!(repo.root().join("theirs.txt").exists());

    let status = engine.check_sync("feature/2-y", "main").expect("recheck");
    assert_eq!(status, BranchSyncStatus::new(0, 1));
}

#[test]
fn conflicting_rebase_is_terminal_and_left_in_progress() {
    let repo = TestRepo::new().expect("repo");
    feature_branch(&repo, "feature/3-z", &[("README.md", "mine\n")]);
    repo.advance_origin("main", "README.md", "theirs\n").expect("advance");

    let runner = ProcessRunner::new(repo.root());
    let mut engine = BranchSyncEngine::new(Git::new(&runner));
    let err = engine.resync("main").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OperationFailed(Failure::RebaseConflict));
    assert_eq!(err.context().get("base").map(String::as_str), Some("main"));
    let git_dir = repo.root().join(".git");
    assert!(git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists());
}

#[test]
fn conflict_is_not_mistaken_for_a_network_failure() {
    let repo = TestRepo::new().expect("repo");
    repo.git(&["checkout", "-q", "-b", "feature/4-net"]).expect("checkout");
    repo.commit_file("README.md", "mine\n", "fix network timeout handling")
        .expect("commit");
    repo.advance_origin("main", "README.md", "theirs\n").expect("advance");

    let runner = ProcessRunner::new(repo.root());
    let mut engine = BranchSyncEngine::new(Git::new(&runner));
    let err = engine.resync("main").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OperationFailed(Failure::RebaseConflict));
    assert!(!err.kind().is_transient());
    assert!(Git::new(&runner).rebase_in_progress().expect("inspect"));
}

#[test]
fn missing_remote_base_fails_the_check() {
    let repo = TestRepo::new().expect("repo");
    let runner = ProcessRunner::new(repo.root());
    let mut engine = BranchSyncEngine::new(Git::new(&runner));

    let err = engine.check_sync("main", "no-such-base").unwrap_err();
    assert_eq!(
        err.kind(),
        ErrorKind::ResourceNotFound(agt::core::error::Resource::Branch)
    );
    assert_eq!(engine.state(), SyncState::Unknown);
}
