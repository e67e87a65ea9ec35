//! `.agtrc.json` configuration.
//!
//! Looked up in the working directory first, then the home directory. A file
//! that fails to parse or validate never stops a workflow: the defaults are
//! used and the problems come back as warnings.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::Draft;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::types::BranchType;

pub const CONFIG_FILE_NAME: &str = ".agtrc.json";

const CONFIG_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/config.schema.json"
));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct AgtConfig {
    /// Base branch for new pull requests.
    pub default_base_branch: String,
    /// Offered in order when creating a branch.
    pub branch_types: Vec<BranchType>,
    /// Assign new issues and pull requests to the current user.
    pub auto_assign: bool,
    /// Preselected when choosing labels.
    pub default_labels: Vec<String>,
    /// Offer the built-in body templates.
    pub auto_templates: bool,
    pub command_timeout_secs: u64,
    pub prompt_timeout_secs: u64,
}

impl Default for AgtConfig {
    fn default() -> Self {
        Self {
            default_base_branch: "main".to_string(),
            branch_types: vec![
                BranchType::new("1", "feature", "Develop new features"),
                BranchType::new("2", "bugfix", "Fix bugs"),
                BranchType::new("3", "hotfix", "Urgent fixes"),
                BranchType::new("4", "release", "Prepare for a release"),
            ],
            auto_assign: true,
            default_labels: Vec::new(),
            auto_templates: true,
            command_timeout_secs: 60,
            prompt_timeout_secs: 300,
        }
    }
}

impl AgtConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    /// Every violated rule, one message each. Empty means valid.
    pub fn problems(&self) -> Vec<String> {
        static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]+$").unwrap());

        let mut problems = Vec::new();
        if self.default_base_branch.trim().is_empty() {
            problems.push("defaultBaseBranch must be a non-empty string".to_string());
        }
        if self.branch_types.is_empty() {
            problems.push("branchTypes cannot be empty".to_string());
        }
        for (index, ty) in self.branch_types.iter().enumerate() {
            if ty.id.trim().is_empty() || ty.name.is_empty() || ty.description.trim().is_empty() {
                problems.push(format!(
                    "branchTypes[{index}] must have id, name, and description fields"
                ));
            }
            if !NAME_RE.is_match(&ty.name) {
                problems.push(format!(
                    "branchTypes[{index}].name must contain only lowercase letters"
                ));
            }
        }
        if self.command_timeout_secs == 0 {
            problems.push("commandTimeoutSecs must be > 0".to_string());
        }
        if self.prompt_timeout_secs == 0 {
            problems.push("promptTimeoutSecs must be > 0".to_string());
        }
        problems
    }

    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            return Ok(());
        }
        Err(anyhow!("invalid configuration:\n- {}", problems.join("\n- ")))
    }
}

/// Result of a lenient load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: AgtConfig,
    /// File the config came from; `None` when defaults are in use.
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

pub fn local_config_path(cwd: &Path) -> PathBuf {
    cwd.join(CONFIG_FILE_NAME)
}

pub fn global_config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE_NAME)
}

/// Project-local file if it exists, else the home file if it exists.
pub fn find_config(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let local = local_config_path(cwd);
    if local.is_file() {
        return Some(local);
    }
    home.map(global_config_path).filter(|path| path.is_file())
}

/// Load config, falling back to defaults with warnings on any problem.
pub fn load_config(cwd: &Path, home: Option<&Path>) -> LoadedConfig {
    let Some(path) = find_config(cwd, home) else {
        debug!("no config file, using defaults");
        return LoadedConfig {
            config: AgtConfig::default(),
            source: None,
            warnings: Vec::new(),
        };
    };
    match load_config_from(&path) {
        Ok(config) => {
            debug!(path = %path.display(), "config loaded");
            LoadedConfig {
                config,
                source: Some(path),
                warnings: Vec::new(),
            }
        }
        Err(err) => {
            let message = format!("{err:#}");
            warn!(path = %path.display(), err = %message, "config rejected, using defaults");
            LoadedConfig {
                config: AgtConfig::default(),
                source: None,
                warnings: vec![format!(
                    "{message}\nUsing default configuration instead."
                )],
            }
        }
    }
}

/// Strict load: schema check, merge over defaults, semantic check.
pub fn load_config_from(path: &Path) -> Result<AgtConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    validate_schema(&value)?;
    let config: AgtConfig = serde_json::from_value(value)
        .with_context(|| format!("decode {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(CONFIG_SCHEMA).context("parse config schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile config schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("invalid configuration:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

/// Atomically write config as pretty JSON (temp file + rename).
pub fn save_config(path: &Path, cfg: &AgtConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = serde_json::to_string_pretty(cfg).context("serialize config")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
