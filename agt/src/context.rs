//! Everything one invocation needs, built once in `main` and handed to every
//! workflow.

use tracing::warn;

use crate::core::error::ClassifiedError;
use crate::core::retry::RetryPolicy;
use crate::io::audit_log::AuditLog;
use crate::io::cache::TtlCache;
use crate::io::config::AgtConfig;
use crate::io::git::Git;
use crate::io::github::GitHub;
use crate::io::prompt::Prompter;
use crate::io::runner::CommandRunner;
use crate::io::sync::BranchSyncEngine;
use crate::io::templates::TemplateSource;

pub struct Context<'a> {
    pub runner: &'a dyn CommandRunner,
    pub prompter: &'a dyn Prompter,
    pub templates: &'a dyn TemplateSource,
    pub config: AgtConfig,
    pub cache: TtlCache,
    pub retry: RetryPolicy,
    pub audit: Option<AuditLog>,
}

impl<'a> Context<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        prompter: &'a dyn Prompter,
        templates: &'a dyn TemplateSource,
        config: AgtConfig,
    ) -> Self {
        Self {
            runner,
            prompter,
            templates,
            config,
            cache: TtlCache::new(),
            retry: RetryPolicy::default(),
            audit: None,
        }
    }

    pub fn with_cache(mut self, cache: TtlCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn git(&self) -> Git<'_> {
        Git::new(self.runner)
    }

    pub fn github(&self) -> GitHub<'_> {
        GitHub::new(self.runner, &self.cache, self.retry)
    }

    pub fn sync_engine(&self) -> BranchSyncEngine<'_> {
        BranchSyncEngine::new(self.git())
    }

    /// Repository first, then `gh`: the order every mutating workflow checks.
    pub fn ensure_environment(&self) -> Result<(), ClassifiedError> {
        self.git().ensure_repository()?;
        self.github().ensure_installed()
    }

    /// Record a failure that the workflow reports but does not stop on.
    pub fn note_failure(&self, err: &ClassifiedError, operation: &str) {
        warn!(kind = %err.kind(), operation, err = %err, "step failed");
        if let Some(audit) = &self.audit {
            audit.error(err, operation);
        }
    }
}
