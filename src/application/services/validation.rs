//! Field validation shared by the configuration services.

use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

use crate::error::AppError;
use crate::lookup::FieldErrors;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid name regex"));

const MAX_NAME_LEN: usize = 64;
const MAX_TITLE_LEN: usize = 256;

pub(crate) fn add_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

/// Checks the syntax of a reference name (`[A-Za-z0-9_-]`, at most 64 chars).
pub(crate) fn check_name(errors: &mut FieldErrors, name: &str) {
    if name.is_empty() {
        add_error(errors, "name", "Name is required.");
    } else if name.len() > MAX_NAME_LEN {
        add_error(
            errors,
            "name",
            format!("Name must be at most {MAX_NAME_LEN} characters."),
        );
    } else if !NAME_PATTERN.is_match(name) {
        add_error(
            errors,
            "name",
            "Name may only contain letters, digits, '-' and '_'.",
        );
    }
}

pub(crate) fn check_title(errors: &mut FieldErrors, title: &str) {
    if title.trim().is_empty() {
        add_error(errors, "title", "Title is required.");
    } else if title.chars().count() > MAX_TITLE_LEN {
        add_error(
            errors,
            "title",
            format!("Title must be at most {MAX_TITLE_LEN} characters."),
        );
    }
}

/// Merges type-specific configuration errors under the `config.` prefix.
pub(crate) fn merge_config_errors(errors: &mut FieldErrors, config_errors: FieldErrors) {
    for (field, messages) in config_errors {
        let field = if field == "config" || field.starts_with("config.") {
            field
        } else {
            format!("config.{field}")
        };
        errors.entry(field).or_default().extend(messages);
    }
}

/// Turns a non-empty error map into [`AppError::Validation`].
pub(crate) fn ensure_valid(errors: FieldErrors) -> Result<(), AppError> {
    if errors.is_empty() {
        return Ok(());
    }
    Err(AppError::bad_request(
        "Validation failed",
        json!({ "errors": errors }),
    ))
}

/// Like [`ensure_valid`], but a name taken by another record is a
/// [`AppError::Conflict`] carrying the full error map.
pub(crate) fn ensure_storable(errors: FieldErrors, name_taken: bool) -> Result<(), AppError> {
    if name_taken {
        return Err(AppError::conflict(
            "Name is already in use",
            json!({ "errors": errors }),
        ));
    }
    ensure_valid(errors)
}

/// Splits an `{id_or_name}` path segment.
pub(crate) enum IdOrName<'a> {
    Id(i64),
    Name(&'a str),
}

impl<'a> IdOrName<'a> {
    pub(crate) fn parse(raw: &'a str) -> Self {
        match raw.parse::<i64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Name(raw),
        }
    }
}
