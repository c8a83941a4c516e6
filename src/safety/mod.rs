//! Read-only safety gate.
//!
//! Every SQL string that can reach a data source passes through
//! [`SqlValidator`]: ad-hoc SQL, SQL produced by a translator, and the
//! executor's own check right before execution. Table names accepted at the
//! boundary are restricted to a safe identifier alphabet here as well.

mod validator;

pub use validator::{
    is_safe_identifier_char, sanitize_identifier, validate_table_name, SqlValidator,
    FORBIDDEN_KEYWORDS,
};

use std::fmt;

/// Why a SQL string or table name was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Nothing left after stripping comments and whitespace.
    Empty,
    /// The text contains a forbidden keyword or comment marker.
    ForbiddenKeyword(&'static str),
    /// The statement does not start with SELECT or WITH.
    NotSelect,
    /// A `;` remains after removing the trailing terminator.
    MultipleStatements,
    /// The table name is blank.
    EmptyTableName,
    /// The table name contains characters outside `[A-Za-z0-9._]`.
    UnsafeTableName(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "SQL is empty."),
            Self::ForbiddenKeyword(kw) => write!(f, "Forbidden keyword: {kw}"),
            Self::NotSelect => write!(
                f,
                "Only read-only SELECT (or WITH) queries are allowed. No INSERT/UPDATE/DELETE/DROP etc."
            ),
            Self::MultipleStatements => write!(f, "Only a single SQL statement is allowed."),
            Self::EmptyTableName => write!(f, "Table name is required."),
            Self::UnsafeTableName(name) => write!(
                f,
                "Invalid table name '{name}': only letters, digits, '.' and '_' are allowed."
            ),
        }
    }
}
