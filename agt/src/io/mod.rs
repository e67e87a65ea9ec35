//! Side-effecting collaborators: processes, files, prompts and the typed
//! `git`/`gh` wrappers built on [`runner::CommandRunner`].

pub mod audit_log;
pub mod cache;
pub mod config;
pub mod git;
pub mod github;
pub mod process;
pub mod prompt;
pub mod runner;
pub mod sync;
pub mod templates;
