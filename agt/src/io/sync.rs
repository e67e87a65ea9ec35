//! Reconciles a local branch with its remote base before a pull request.

use tracing::{debug, info, instrument, warn};

use crate::core::error::{ClassifiedError, ErrorKind, Failure};
use crate::core::types::BranchSyncStatus;
use crate::io::git::Git;

/// Where the engine stands after its last operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing checked yet, or a resync changed the branch since.
    Unknown,
    Synced(BranchSyncStatus),
    Diverged(BranchSyncStatus),
}

pub struct BranchSyncEngine<'a> {
    git: Git<'a>,
    state: SyncState,
}

impl<'a> BranchSyncEngine<'a> {
    pub fn new(git: Git<'a>) -> Self {
        Self {
            git,
            state: SyncState::Unknown,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Fetch `origin/<base>` and count commits each side lacks. Always hits
    /// the remote; the result is never cached.
    #[instrument(skip_all, fields(local, base))]
    pub fn check_sync(&mut self, local: &str, base: &str) -> Result<BranchSyncStatus, ClassifiedError> {
        self.state = SyncState::Unknown;
        self.git.fetch(base)?;
        let status = self.git.divergence(base, local)?;
        self.state = if status.is_synced {
            SyncState::Synced(status)
        } else {
            SyncState::Diverged(status)
        };
        debug!(behind = status.behind, ahead = status.ahead, "sync checked");
        Ok(status)
    }

    /// Rebase the checked-out branch onto `origin/<base>`, fetching first if
    /// nothing was checked yet.
    ///
    /// A conflicting rebase is left in progress for the user to resolve and
    /// fails with the rebase-conflict kind.
    #[instrument(skip_all, fields(base))]
    pub fn resync(&mut self, base: &str) -> Result<(), ClassifiedError> {
        if self.state == SyncState::Unknown {
            self.git.fetch(base)?;
        }
        self.state = SyncState::Unknown;
        match self.git.rebase_onto(base) {
            Ok(()) => {
                info!(base, "rebased onto remote base");
                Ok(())
            }
            Err(err) if self.stopped_on_conflict(&err) => {
                warn!(base, kind = %err.kind(), "rebase stopped on conflicts");
                Err(ClassifiedError::operation_failed(
                    Failure::RebaseConflict,
                    err.message().to_string(),
                )
                .with_context("base", base))
            }
            Err(err) => Err(err),
        }
    }
}

impl BranchSyncEngine<'_> {
    /// The git directory decides; the message is only consulted when it
    /// cannot be inspected.
    fn stopped_on_conflict(&self, err: &ClassifiedError) -> bool {
        match self.git.rebase_in_progress() {
            Ok(in_progress) => in_progress,
            Err(check) => {
                debug!(err = %check, "could not inspect the git directory");
                is_conflict(err)
            }
        }
    }
}

fn is_conflict(err: &ClassifiedError) -> bool {
    if err.kind() == ErrorKind::OperationFailed(Failure::RebaseConflict) {
        return true;
    }
    let message = err.message().to_lowercase();
    err.kind() == ErrorKind::CommandFailed
        && (message.contains("could not apply") || message.contains("conflict"))
}
