//! The single choke point for external commands.
//!
//! Every `git`/`gh` invocation goes through a [`CommandRunner`]. The process
//! implementation classifies failures and appends one audit record per call,
//! success or not. Tests substitute a scripted runner (see
//! `test_support::ScriptedRunner`) that never spawns processes.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::core::classifier::{RawFailure, classify};
use crate::core::error::ClassifiedError;
use crate::core::types::{CommandResult, CommandSpec};
use crate::io::audit_log::{AuditLog, CommandOutcome};
use crate::io::process::{DEFAULT_OUTPUT_LIMIT_BYTES, run_command_with_timeout};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Abstraction over external command execution.
pub trait CommandRunner {
    /// Run one command to completion. Non-zero exit, spawn failure, timeout
    /// and undecodable output all come back as a [`ClassifiedError`].
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ClassifiedError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ClassifiedError> {
        (**self).run(spec)
    }
}

/// Runs commands as child processes in a fixed working directory.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    workdir: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
    audit: Option<AuditLog>,
}

impl ProcessRunner {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            audit: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn execute(&self, spec: &CommandSpec) -> Result<CommandResult, RawFailure> {
        let program = spec.program().to_string();
        if !self.workdir.is_dir() {
            return Err(RawFailure::MissingWorkdir {
                program,
                path: self.workdir.display().to_string(),
            });
        }
        let mut cmd = Command::new(spec.program());
        cmd.args(spec.args())
            .current_dir(&self.workdir)
            // stdin is closed; never block on a credential or editor prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GH_PROMPT_DISABLED", "1");

        let output = match run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes) {
            Ok(output) => output,
            Err(err) => {
                let kind = err
                    .chain()
                    .find_map(|e| e.downcast_ref::<io::Error>())
                    .map_or(io::ErrorKind::Other, io::Error::kind);
                return Err(RawFailure::Spawn {
                    program,
                    kind,
                    message: format!("{err:#}"),
                });
            }
        };

        if output.timed_out {
            return Err(RawFailure::TimedOut {
                program,
                after: self.timeout,
            });
        }
        if !output.status.success() {
            return Err(RawFailure::Exit {
                program,
                code: output.status.code(),
                stderr: output.stderr_lossy(),
            });
        }
        let stdout = String::from_utf8(output.stdout).map_err(|_| RawFailure::Decode { program })?;
        Ok(CommandResult::new(stdout, output.status.code().unwrap_or(0)))
    }
}

impl CommandRunner for ProcessRunner {
    #[instrument(skip_all, fields(command = %spec))]
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ClassifiedError> {
        let started = Instant::now();
        let result = self.execute(spec).map_err(|raw| {
            classify(&raw)
                .with_context("command", spec.to_string())
                .with_context("cwd", self.workdir.display().to_string())
        });
        let elapsed = started.elapsed();

        match &result {
            Ok(out) => {
                debug!(exit_code = out.exit_code, elapsed_ms = elapsed.as_millis() as u64, "command ok");
                if let Some(audit) = &self.audit {
                    audit.command(
                        spec,
                        CommandOutcome::Ok {
                            exit_code: out.exit_code,
                        },
                        elapsed,
                    );
                }
            }
            Err(err) => {
                warn!(kind = %err.kind(), err = %err, "command failed");
                if let Some(audit) = &self.audit {
                    audit.command(spec, CommandOutcome::Failed(err), elapsed);
                }
            }
        }
        result
    }
}
