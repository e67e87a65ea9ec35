//! `agt label`: create a repository label.

use tracing::{info, instrument};

use crate::context::Context;
use crate::core::error::ClassifiedError;
use crate::core::types::LabelDraft;
use crate::core::validate::{DEFAULT_LABEL_COLOR, label_draft};

/// Values given on the command line; anything missing is prompted for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

/// Input is validated before any command runs, so a bad color never reaches
/// `git` or `gh`.
#[instrument(skip_all)]
pub fn create_label(ctx: &Context<'_>, request: LabelRequest) -> Result<LabelDraft, ClassifiedError> {
    let name = match request.name {
        Some(name) => name,
        None => ctx.prompter.input("Label name", None)?,
    };
    let color = match request.color {
        Some(color) => color,
        None => ctx
            .prompter
            .input("Label color (hex, e.g. FF5733)", Some(DEFAULT_LABEL_COLOR))?,
    };
    let description = match request.description {
        Some(description) => description,
        None => ctx.prompter.input("Label description (optional)", Some(""))?,
    };
    let draft = label_draft(&name, &color, &description)?;

    ctx.ensure_environment()?;
    ctx.github().create_label(draft.clone())?;
    info!(name = draft.name(), color = draft.color(), "label created");
    ctx.prompter.show(&format!(
        "Created label '{}' (#{})",
        draft.name(),
        draft.color()
    ));
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ErrorKind, InvalidInput};
    use crate::io::config::AgtConfig;
    use crate::test_support::{ScriptedPrompter, ScriptedRunner, StaticTemplates};

    #[test]
    fn bad_color_fails_before_any_command() {
        let runner = ScriptedRunner::new();
        let prompter = ScriptedPrompter::new();
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default());

        let err = create_label(
            &ctx,
            LabelRequest {
                name: Some("bug".to_string()),
                color: Some("zzz".to_string()),
                description: Some(String::new()),
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput(InvalidInput::Color));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn prompts_for_missing_fields_and_normalizes_color() {
        let runner = ScriptedRunner::new()
            .ok(&["git", "rev-parse", "--is-inside-work-tree"], "true")
            .ok(&["gh", "--version"], "gh version 2.40.0")
            .ok(&["gh", "label", "create"], "");
        let prompter = ScriptedPrompter::new().text("#ff5733").text("Needs triage");
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default());

        let draft = create_label(
            &ctx,
            LabelRequest {
                name: Some("triage".to_string()),
                ..LabelRequest::default()
            },
        )
        .expect("label");
        assert_eq!(draft.color(), "FF5733");
        assert_eq!(runner.count(&["gh", "label", "create"]), 1);
        let create = runner.calls().pop().expect("create");
        assert_eq!(
            create.args(),
            [
                "label",
                "create",
                "triage",
                "--color",
                "FF5733",
                "--description",
                "Needs triage",
            ]
        );
    }

    #[test]
    fn empty_color_defaults_to_white() {
        let runner = ScriptedRunner::new()
            .ok(&["git", "rev-parse", "--is-inside-work-tree"], "true")
            .ok(&["gh", "--version"], "gh version 2.40.0")
            .ok(&["gh", "label", "create"], "");
        let prompter = ScriptedPrompter::new().text("docs").text("").text("");
        let templates = StaticTemplates::none();
        let ctx = Context::new(&runner, &prompter, &templates, AgtConfig::default());

        let draft = create_label(&ctx, LabelRequest::default()).expect("label");
        assert_eq!(draft.color(), "FFFFFF");
        assert_eq!(draft.description(), None);
    }
}
