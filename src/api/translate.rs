//! Natural-language to SQL translation.
//!
//! Translation quality is best-effort; whatever a translator returns still
//! goes through the read-only validator before anyone sees it.

use crate::db::{DatabaseBackend, SchemaEntry};
use crate::error::{EngineError, Result};
use crate::safety::validate_table_name;
use async_trait::async_trait;

/// Query returned when a question names no known table.
pub const PLACEHOLDER_SQL: &str = "SELECT 1 AS placeholder LIMIT 1";

/// Turns a question into SQL for a given data source.
#[async_trait]
pub trait SqlTranslator: Send + Sync {
    /// Translates `question` using the live table list of the target.
    async fn translate(
        &self,
        question: &str,
        backend: DatabaseBackend,
        tables: &[SchemaEntry],
    ) -> Result<String>;
}

/// Rule-based translator that looks for table names in the question.
#[derive(Debug, Clone, Default)]
pub struct TableLookupTranslator {
    /// Custom mappings (pattern -> SQL), checked first.
    rules: Vec<(String, String)>,
}

impl TableLookupTranslator {
    /// Creates a translator with no custom rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom mapping: questions containing `pattern` produce `sql`.
    pub fn with_rule(mut self, pattern: impl Into<String>, sql: impl Into<String>) -> Self {
        self.rules.push((pattern.into().to_lowercase(), sql.into()));
        self
    }
}

/// True if `word` names `table`, allowing a plural `s` on either side.
fn names_table(word: &str, table: &str) -> bool {
    word == table
        || word.strip_suffix('s') == Some(table)
        || table.strip_suffix('s') == Some(word)
}

#[async_trait]
impl SqlTranslator for TableLookupTranslator {
    async fn translate(
        &self,
        question: &str,
        backend: DatabaseBackend,
        tables: &[SchemaEntry],
    ) -> Result<String> {
        let question = question.trim().to_lowercase();
        if question.is_empty() {
            return Err(EngineError::validation("Please enter a question."));
        }

        if let Some((_, sql)) = self.rules.iter().find(|(p, _)| question.contains(p.as_str())) {
            return Ok(sql.clone());
        }

        let words: Vec<&str> = question
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .collect();

        let table = tables
            .iter()
            .filter(|t| validate_table_name(&t.name).is_ok())
            .find(|t| {
                let name = t.name.to_lowercase();
                words.iter().any(|w| names_table(w, &name))
            });

        let Some(table) = table else {
            return Ok(PLACEHOLDER_SQL.to_string());
        };

        let quoted = backend.quote_identifier(&table.name);
        if question.contains("how many") || words.contains(&"count") {
            Ok(format!("SELECT COUNT(*) AS count FROM {quoted}"))
        } else {
            Ok(format!("SELECT * FROM {quoted} LIMIT 100"))
        }
    }
}
