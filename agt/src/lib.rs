//! Automates GitHub issue, branch, pull request and label workflows by
//! driving `git` and `gh`.
//!
//! - **[`core`]**: pure logic (error taxonomy, classification, retry schedule,
//!   validation, data model). No I/O.
//! - **[`io`]**: processes, files, prompts and the typed `git`/`gh` wrappers,
//!   all behind traits so tests can script them.
//!
//! The workflow modules ([`issue`], [`branch`], [`pr`], [`label`], [`list`],
//! [`search`], [`stats`], [`setup`]) sequence those pieces for one command,
//! sharing a [`context::Context`] built once per invocation.

pub mod branch;
pub mod context;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod issue;
pub mod label;
pub mod list;
pub mod logging;
pub mod pr;
pub mod search;
pub mod setup;
pub mod stats;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
