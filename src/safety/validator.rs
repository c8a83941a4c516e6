//! Substring-based read-only SQL validation.
//!
//! The forbidden-keyword check is a plain substring match on the lowercased,
//! comment-free text. It is conservative on purpose: an identifier such as
//! `update_count` or `created_at` is rejected along with real DML/DDL. Callers
//! that hit such a false positive have to alias the column in the database.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::RejectReason;
use crate::error::{EngineError, Result};

/// Substrings that may not appear anywhere in a normalized statement.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "create", "alter", "truncate", "grant", "revoke",
    "exec", "execute", "xp_", "sp_", ";--", "/*", "*/",
];

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--[^\n]*").expect("line comment pattern is valid"));

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid"));

/// Validates that SQL is a single read-only statement.
///
/// The validator holds no state, so every call site can own its own instance
/// while sharing the one keyword list above.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlValidator;

impl SqlValidator {
    /// Creates a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Validates `sql`, returning the normalized statement or a validation error.
    pub fn validate(&self, sql: &str) -> Result<String> {
        self.check(sql).map_err(|reason| {
            debug!("Rejected SQL ({reason}): {sql}");
            EngineError::validation(reason.to_string())
        })
    }

    /// Like [`validate`](Self::validate) but keeps the typed rejection reason.
    pub fn check(&self, sql: &str) -> std::result::Result<String, RejectReason> {
        let normalized = normalize(sql);
        if normalized.is_empty() {
            return Err(RejectReason::Empty);
        }

        let lower = normalized.to_lowercase();
        if let Some(kw) = FORBIDDEN_KEYWORDS.iter().copied().find(|kw| lower.contains(kw)) {
            return Err(RejectReason::ForbiddenKeyword(kw));
        }

        match lower.split(' ').next() {
            Some("select") | Some("with") => {}
            _ => return Err(RejectReason::NotSelect),
        }

        if normalized.contains(';') {
            return Err(RejectReason::MultipleStatements);
        }

        Ok(normalized)
    }

    /// Returns true if `sql` passes validation.
    pub fn is_read_only(&self, sql: &str) -> bool {
        self.check(sql).is_ok()
    }
}

/// Strips comments, collapses whitespace and removes one trailing `;`.
fn normalize(sql: &str) -> String {
    let without_lines = LINE_COMMENT.replace_all(sql, "");
    let without_blocks = BLOCK_COMMENT.replace_all(&without_lines, "");
    let collapsed = without_blocks.split_whitespace().collect::<Vec<_>>().join(" ");

    match collapsed.strip_suffix(';') {
        Some(stripped) => stripped.trim_end().to_string(),
        None => collapsed,
    }
}

/// Returns true for characters allowed in a table name: `[A-Za-z0-9._]`.
pub fn is_safe_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '_'
}

/// Checks a table name at the boundary, before any SQL is generated from it.
pub fn validate_table_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EngineError::validation(RejectReason::EmptyTableName.to_string()));
    }
    if !trimmed.chars().all(is_safe_identifier_char) {
        return Err(EngineError::validation(
            RejectReason::UnsafeTableName(name.to_string()).to_string(),
        ));
    }
    Ok(trimmed)
}

/// Drops every character outside the safe identifier alphabet.
///
/// Used only to build cache keys; it never makes a name safe to execute.
pub fn sanitize_identifier(value: &str) -> String {
    value.trim().chars().filter(|c| is_safe_identifier_char(*c)).collect()
}
