//! Input validators. All of these run before any external command is issued.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::error::{ClassifiedError, InvalidInput};
use crate::core::types::LabelDraft;

pub const MAX_BRANCH_NAME_LEN: usize = 255;
pub const DEFAULT_LABEL_COLOR: &str = "FFFFFF";

/// Lower-cases, turns whitespace runs into `-`, drops everything outside
/// `[a-z0-9_-]`, collapses repeated `-` and trims `-` from both ends.
/// Idempotent.
pub fn sanitize_branch_name(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for ch in name.to_lowercase().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                spaced.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_' {
            spaced.push(ch);
        }
    }

    let mut out = String::with_capacity(spaced.len());
    for ch in spaced.chars() {
        if ch == '-' && out.ends_with('-') {
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('-').to_string()
}

/// `<type>/<issue>-<sanitized title>`, validated.
pub fn branch_name(
    branch_type: &str,
    issue_number: u64,
    title: &str,
) -> Result<String, ClassifiedError> {
    let slug = sanitize_branch_name(title);
    let name = if slug.is_empty() {
        format!("{branch_type}/{issue_number}")
    } else {
        format!("{branch_type}/{issue_number}-{slug}")
    };
    validate_branch_name(&name)?;
    Ok(name)
}

pub fn validate_branch_name(name: &str) -> Result<(), ClassifiedError> {
    static BRANCH_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_/-]+$").unwrap());

    let invalid = |reason: &str| {
        Err(
            ClassifiedError::invalid_input(InvalidInput::BranchName, reason.to_string())
                .with_context("branch", name),
        )
    };
    if name.is_empty() {
        return invalid("branch name is empty");
    }
    if name.len() > MAX_BRANCH_NAME_LEN {
        return invalid("branch name is longer than 255 characters");
    }
    if !BRANCH_RE.is_match(name) {
        return invalid("branch name contains characters outside [a-zA-Z0-9_/-]");
    }
    if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
        return invalid("branch name has an empty path component");
    }
    if name.starts_with('-') {
        return invalid("branch name cannot start with '-'");
    }
    Ok(())
}

/// Parses a positive integer issue number.
pub fn validate_issue_number(input: &str) -> Result<u64, ClassifiedError> {
    let trimmed = input.trim().trim_start_matches('#');
    match trimmed.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ClassifiedError::invalid_input(
            InvalidInput::IssueNumber,
            format!("invalid issue number '{input}'"),
        )),
    }
}

/// Returns the trimmed value, or an empty-field error naming `field`.
pub fn validate_not_empty(value: &str, field: &str) -> Result<String, ClassifiedError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClassifiedError::invalid_input(
            InvalidInput::EmptyField,
            format!("{field} cannot be empty"),
        )
        .with_context("field", field));
    }
    Ok(trimmed.to_string())
}

/// Empty input defaults to white; otherwise strips one `#`, requires six hex
/// digits and upper-cases.
pub fn normalize_hex_color(input: &str) -> Result<String, ClassifiedError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_LABEL_COLOR.to_string());
    }
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ClassifiedError::invalid_input(
            InvalidInput::Color,
            format!("invalid color '{input}'"),
        )
        .with_context("color", input));
    }
    Ok(hex.to_ascii_uppercase())
}

pub fn label_draft(
    name: &str,
    color: &str,
    description: &str,
) -> Result<LabelDraft, ClassifiedError> {
    let name = validate_not_empty(name, "Label name")?;
    let color = normalize_hex_color(color)?;
    let description = Some(description.trim().to_string()).filter(|d| !d.is_empty());
    Ok(LabelDraft {
        name,
        color,
        description,
    })
}

/// Splits comma-separated input, dropping blanks.
pub fn parse_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
