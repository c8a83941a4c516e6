//! Driver error mapping shared by the dialect clients.

use crate::config::DataSourceConfig;
use crate::db::DatabaseBackend;
use crate::error::EngineError;
use std::time::Duration;

/// Maps sqlx connection errors to user-friendly messages.
pub(crate) fn map_connection_error(error: sqlx::Error, config: &DataSourceConfig) -> EngineError {
    if config.kind == DatabaseBackend::Sqlite {
        let path = config.path().unwrap_or_default();
        return EngineError::connection(format!(
            "Cannot open SQLite database '{path}': {error}"
        ));
    }

    let host = config.host();
    let port = config.port();
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        EngineError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("authentication failed") || error_str.contains("access denied")
    {
        EngineError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if (error_str.contains("does not exist") || error_str.contains("unknown database"))
        && error_str.contains("database")
    {
        EngineError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        connect_timed_out(config, None)
    } else {
        EngineError::connection(error.to_string())
    }
}

/// Error for a connect attempt that exceeded its deadline.
pub(crate) fn connect_timed_out(config: &DataSourceConfig, after: Option<Duration>) -> EngineError {
    let target = match config.kind {
        DatabaseBackend::Sqlite => config.path().unwrap_or_default().to_string(),
        _ => format!("{}:{}", config.host(), config.port()),
    };
    match after {
        Some(after) => EngineError::connection(format!(
            "Connection to {target} timed out after {} seconds.",
            after.as_secs()
        )),
        None => EngineError::connection(format!(
            "Connection to {target} timed out. The server may be overloaded or unreachable."
        )),
    }
}

/// Formats a query error, with Postgres detail and hint when available.
pub(crate) fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
