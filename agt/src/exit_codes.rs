//! Stable exit codes for `agt` commands.

use crate::core::error::ErrorKind;

/// Workflow finished.
pub const OK: i32 = 0;
/// Any failure without a more specific code.
pub const GENERAL: i32 = 1;
/// Bad command line (clap's own exit status).
pub const USAGE: i32 = 2;
/// Not inside a git work tree.
pub const REPOSITORY_MISSING: i32 = 10;
/// `git` or `gh` is not installed.
pub const TOOL_MISSING: i32 = 11;
/// `gh` is not logged in.
pub const AUTH_FAILED: i32 = 12;
/// Network error, timeout or refused connection, after retries.
pub const NETWORK: i32 = 20;
/// Declined, timed-out or closed prompt.
pub const CANCELLED: i32 = 130;

pub fn for_kind(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::RepositoryMissing => REPOSITORY_MISSING,
        ErrorKind::ToolMissing(_) => TOOL_MISSING,
        ErrorKind::AuthFailed => AUTH_FAILED,
        ErrorKind::NetworkError { .. } | ErrorKind::NetworkTimeout | ErrorKind::ConnectionRefused => {
            NETWORK
        }
        ErrorKind::OperationCancelled => CANCELLED,
        ErrorKind::CommandFailed
        | ErrorKind::InvalidInput(_)
        | ErrorKind::ResourceNotFound(_)
        | ErrorKind::OperationFailed(_)
        | ErrorKind::Unknown => GENERAL,
    }
}
