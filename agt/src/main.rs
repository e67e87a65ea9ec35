//! `agt`: GitHub issue, branch, pull request and label workflows over `git`
//! and `gh`.
//!
//! Every run loads `.agtrc.json` (project, then home), builds one
//! [`Context`] and hands it to the chosen workflow. Failures print their
//! remediation hint and exit with a code from [`exit_codes`].

use std::env;
use std::path::{Path, PathBuf};

use agt::context::Context;
use agt::core::error::ClassifiedError;
use agt::exit_codes;
use agt::io::audit_log::{AuditLog, DEFAULT_TAIL_LINES};
use agt::io::cache::TtlCache;
use agt::io::config::{global_config_path, load_config, local_config_path};
use agt::io::github::SearchFilters;
use agt::io::prompt::{ConsolePrompter, Prompter};
use agt::io::runner::ProcessRunner;
use agt::io::templates::FileTemplates;
use agt::label::LabelRequest;
use agt::search::{SearchRequest, SearchTarget};
use agt::{branch, issue, label, list, logging, pr, search, setup, stats};
use anyhow::{Context as _, Result, anyhow};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "agt",
    version,
    about = "Automate GitHub issue, branch, pull request and label workflows"
)]
struct Cli {
    /// Verbose diagnostics on stderr.
    #[arg(long, global = true)]
    debug: bool,
    /// Run as if started in this directory.
    #[arg(long, global = true, value_name = "DIR")]
    cwd: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
enum Command {
    /// List open issues (or pull requests with --prs).
    List {
        #[arg(long)]
        prs: bool,
    },
    /// Create an issue.
    Issue,
    /// Create a branch for an issue, or delete old branches.
    Branch {
        #[command(subcommand)]
        action: Option<BranchAction>,
    },
    /// Create a pull request for the current branch.
    Pr,
    /// Create a label.
    Label {
        #[arg(long)]
        name: Option<String>,
        /// Hex color, with or without '#'.
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Search issues (or pull requests with --prs).
    Search {
        query: String,
        #[arg(long)]
        prs: bool,
        /// open, closed, merged or all.
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// Issues only.
        #[arg(long)]
        label: Option<String>,
    },
    /// Repository statistics.
    Stats,
    /// Check that git and gh are installed and gh is logged in.
    Setup,
    /// Create a configuration file interactively.
    Config {
        /// Write ~/.agtrc.json instead of ./.agtrc.json.
        #[arg(long)]
        global: bool,
    },
    /// Show recent audit log records.
    Log {
        #[arg(long, default_value_t = DEFAULT_TAIL_LINES)]
        lines: usize,
    },
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
enum BranchAction {
    Create,
    Delete,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Issue => "issue",
            Self::Branch { .. } => "branch",
            Self::Pr => "pr",
            Self::Label { .. } => "label",
            Self::Search { .. } => "search",
            Self::Stats => "stats",
            Self::Setup => "setup",
            Self::Config { .. } => "config",
            Self::Log { .. } => "log",
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => report(&err),
    };
    std::process::exit(code);
}

fn report(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ClassifiedError>() {
        Some(classified) => {
            eprint!("{}", classified.render());
            exit_codes::for_kind(classified.kind())
        }
        None => {
            eprintln!("error: {err:#}");
            exit_codes::GENERAL
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let cwd = match cli.cwd {
        Some(dir) => dir,
        None => env::current_dir().context("resolve working directory")?,
    };
    let home = dirs_next::home_dir();
    let loaded = load_config(&cwd, home.as_deref());
    for warning in &loaded.warnings {
        eprintln!("warning: {warning}");
    }
    let config = loaded.config;
    let audit = AuditLog::at_default_location();

    if let Some(Command::Log { lines }) = cli.command {
        return show_log(audit.as_ref(), lines);
    }

    let mut runner = ProcessRunner::new(&cwd).with_timeout(config.command_timeout());
    if let Some(audit) = &audit {
        runner = runner.with_audit_log(audit.clone());
    }
    let prompter = ConsolePrompter::new(config.prompt_timeout());
    let templates = FileTemplates::new(&cwd);
    let mut ctx = Context::new(&runner, &prompter, &templates, config)
        .with_cache(TtlCache::with_default_sweeper());
    if let Some(audit) = audit {
        audit.info(&format!("agt started in {}", cwd.display()));
        ctx = ctx.with_audit_log(audit);
    }

    let command = match cli.command {
        Some(command) => command,
        None => menu(&prompter)?,
    };
    let name = command.name();
    let result = dispatch(&ctx, command, &cwd, home.as_deref());
    if let Err(err) = &result
        && let Some(classified) = err.downcast_ref::<ClassifiedError>()
        && let Some(audit) = &ctx.audit
    {
        audit.error(classified, name);
    }
    result
}

fn dispatch(ctx: &Context<'_>, command: Command, cwd: &Path, home: Option<&Path>) -> Result<i32> {
    match command {
        Command::List { prs: false } => {
            list::list_issues(ctx)?;
        }
        Command::List { prs: true } => {
            list::list_pull_requests(ctx)?;
        }
        Command::Issue => {
            issue::create_issue(ctx)?;
        }
        Command::Branch {
            action: None | Some(BranchAction::Create),
        } => {
            branch::create_branch(ctx)?;
        }
        Command::Branch {
            action: Some(BranchAction::Delete),
        } => {
            let outcome = branch::delete_branches(ctx)?;
            if !outcome.failed.is_empty() {
                return Ok(exit_codes::GENERAL);
            }
        }
        Command::Pr => {
            pr::create_pull_request(ctx)?;
        }
        Command::Label {
            name,
            color,
            description,
        } => {
            label::create_label(
                ctx,
                LabelRequest {
                    name,
                    color,
                    description,
                },
            )?;
        }
        Command::Search {
            query,
            prs,
            state,
            author,
            label,
        } => {
            let request = SearchRequest {
                query,
                target: if prs {
                    SearchTarget::PullRequests
                } else {
                    SearchTarget::Issues
                },
                filters: SearchFilters {
                    state,
                    author,
                    label,
                },
            };
            search::search(ctx, &request)?;
        }
        Command::Stats => {
            stats::show_stats(ctx)?;
        }
        Command::Setup => {
            let report = setup::check_environment(ctx);
            if let Some(err) = report.first_problem() {
                return Ok(exit_codes::for_kind(err.kind()));
            }
        }
        Command::Config { global } => {
            let path = if global {
                let home = home.ok_or_else(|| anyhow!("cannot locate the home directory"))?;
                global_config_path(home)
            } else {
                local_config_path(cwd)
            };
            setup::init_config(ctx.prompter, &path, &ctx.config)?;
        }
        Command::Log { lines } => return show_log(ctx.audit.as_ref(), lines),
    }
    Ok(exit_codes::OK)
}

/// The interactive entry point when no subcommand is given.
fn menu(prompter: &dyn Prompter) -> Result<Command> {
    let entries = [
        "List open issues",
        "List open pull requests",
        "Create an issue",
        "Create a branch for an issue",
        "Delete branches",
        "Create a pull request",
        "Create a label",
        "Search issues",
        "Repository statistics",
        "Check setup",
        "Create a configuration file",
        "Show recent log",
    ];
    let choices: Vec<String> = entries.iter().map(|e| (*e).to_string()).collect();
    let command = match prompter.select("What would you like to do?", &choices)? {
        0 => Command::List { prs: false },
        1 => Command::List { prs: true },
        2 => Command::Issue,
        3 => Command::Branch {
            action: Some(BranchAction::Create),
        },
        4 => Command::Branch {
            action: Some(BranchAction::Delete),
        },
        5 => Command::Pr,
        6 => Command::Label {
            name: None,
            color: None,
            description: None,
        },
        7 => Command::Search {
            query: prompter.input("Search for", None)?,
            prs: false,
            state: None,
            author: None,
            label: None,
        },
        8 => Command::Stats,
        9 => Command::Setup,
        10 => Command::Config { global: false },
        _ => Command::Log {
            lines: DEFAULT_TAIL_LINES,
        },
    };
    Ok(command)
}

fn show_log(audit: Option<&AuditLog>, lines: usize) -> Result<i32> {
    let audit = audit.ok_or_else(|| anyhow!("cannot locate the log directory"))?;
    let records = audit.tail(lines)?;
    if records.is_empty() {
        println!("No log records in {}", audit.path().display());
    }
    for record in &records {
        println!("{}", serde_json::to_string(record).context("serialize log record")?);
    }
    Ok(exit_codes::OK)
}
