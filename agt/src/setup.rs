//! `agt setup` (environment check) and `agt config` (interactive config file).

use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::{info, instrument};

use crate::context::Context;
use crate::core::error::ClassifiedError;
use crate::core::types::CommandSpec;
use crate::core::validate::{parse_csv, validate_not_empty};
use crate::io::config::{AgtConfig, save_config};
use crate::io::prompt::Prompter;
use crate::io::runner::CommandRunner;

/// One line per tool: the version it reported, or why it is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentReport {
    pub git: Result<String, ClassifiedError>,
    pub gh: Result<String, ClassifiedError>,
    /// Skipped (`None`) when `gh` itself is missing.
    pub gh_auth: Option<Result<(), ClassifiedError>>,
}

impl EnvironmentReport {
    pub fn is_ready(&self) -> bool {
        self.git.is_ok() && self.gh.is_ok() && matches!(self.gh_auth, Some(Ok(())))
    }

    /// The first problem found, for the exit status.
    pub fn first_problem(&self) -> Option<&ClassifiedError> {
        self.git
            .as_ref()
            .err()
            .or_else(|| self.gh.as_ref().err())
            .or_else(|| self.gh_auth.as_ref().and_then(|auth| auth.as_ref().err()))
    }
}

fn version(runner: &dyn CommandRunner, spec: CommandSpec) -> Result<String, ClassifiedError> {
    let out = runner.run(&spec)?;
    Ok(out.lines().next().unwrap_or_default().to_string())
}

#[instrument(skip_all)]
pub fn check_environment(ctx: &Context<'_>) -> EnvironmentReport {
    let git = version(ctx.runner, CommandSpec::git(["--version"]));
    let gh = version(ctx.runner, CommandSpec::gh(["--version"]));
    let gh_auth = gh
        .is_ok()
        .then(|| ctx.github().auth_status().map(drop));

    let mut text = String::from("Environment:");
    text.push_str(&format!("\n  git: {}", describe(&git)));
    text.push_str(&format!("\n  gh: {}", describe(&gh)));
    match &gh_auth {
        Some(Ok(())) => text.push_str("\n  gh auth: logged in"),
        Some(Err(err)) => text.push_str(&format!("\n  gh auth: {}", err.kind().hint().title)),
        None => text.push_str("\n  gh auth: skipped"),
    }
    ctx.prompter.show(&text);

    let report = EnvironmentReport { git, gh, gh_auth };
    if let Some(err) = report.first_problem() {
        ctx.note_failure(err, "environment check");
    }
    report
}

fn describe(result: &Result<String, ClassifiedError>) -> String {
    match result {
        Ok(version) => version.clone(),
        Err(err) => format!("{} ({})", err.kind().hint().title, err.message()),
    }
}

/// Ask for the main settings, starting from `current`, and save them to
/// `path`. Branch types and timeouts are kept as they are.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn init_config(prompter: &dyn Prompter, path: &Path, current: &AgtConfig) -> Result<AgtConfig> {
    if path.exists()
        && !prompter.confirm(
            &format!("{} already exists. Overwrite?", path.display()),
            false,
        )?
    {
        return Err(ClassifiedError::cancelled("kept existing configuration").into());
    }

    let base = prompter.input(
        "Default base branch",
        Some(current.default_base_branch.as_str()),
    )?;
    let base = validate_not_empty(&base, "Default base branch")?;
    let auto_assign = prompter.confirm(
        "Assign new issues and pull requests to yourself?",
        current.auto_assign,
    )?;
    let auto_templates =
        prompter.confirm("Use .github templates for bodies?", current.auto_templates)?;
    let labels = current.default_labels.join(",");
    let labels = prompter.input("Default labels (comma separated)", Some(labels.as_str()))?;

    let config = AgtConfig {
        default_base_branch: base,
        auto_assign,
        auto_templates,
        default_labels: parse_csv(&labels),
        ..current.clone()
    };
    save_config(path, &config).with_context(|| format!("save {}", path.display()))?;
    info!("configuration saved");
    prompter.show(&format!("Saved configuration to {}", path.display()));
    Ok(config)
}
