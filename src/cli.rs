//! Command-line argument parsing for flow-reports.

use clap::{Args, Parser, Subcommand};
use flow_reports::api::{RefreshCacheRequest, RunQueryRequest, TestConnectionRequest};
use flow_reports::config::{Config, DataSourceConfig};
use flow_reports::error::Result;
use std::path::PathBuf;

/// Safe read-only queries against registered data sources.
#[derive(Parser, Debug)]
#[command(name = "flow-reports")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Act as this data source owner
    #[arg(
        long,
        value_name = "OWNER",
        env = "FLOW_REPORTS_OWNER",
        default_value = "local",
        global = true
    )]
    pub owner: String,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tables and columns of a data source
    Schema {
        /// Data source id
        id: i64,
    },

    /// Run SQL or dump a table
    Query(QueryArgs),

    /// Drop cached results for a data source
    RefreshCache(RefreshArgs),

    /// Check that a data source accepts connections
    TestConnection(TestConnectionArgs),

    /// Translate a question into read-only SQL
    Generate {
        /// Data source id
        id: i64,

        /// The question, in plain words
        question: String,
    },

    /// Show a data source with its password masked
    Show {
        /// Data source id
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Data source id
    pub id: i64,

    /// SQL to run
    #[arg(long, value_name = "SQL", conflicts_with = "table")]
    pub sql: Option<String>,

    /// Table to select everything from
    #[arg(short = 't', long, value_name = "TABLE")]
    pub table: Option<String>,

    /// Re-execute even if a cached result exists
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Data source id
    pub id: i64,

    /// Only drop the cached dump of this table
    #[arg(short = 't', long, value_name = "TABLE")]
    pub table: Option<String>,

    /// Only drop the cached result of this SQL
    #[arg(long, value_name = "SQL")]
    pub sql: Option<String>,
}

#[derive(Args, Debug)]
pub struct TestConnectionArgs {
    /// Connection string (postgres://, mysql:// or sqlite:)
    #[arg(value_name = "CONNECTION_STRING", required_unless_present = "id")]
    pub connection_string: Option<String>,

    /// Test a configured data source instead
    #[arg(long, value_name = "ID", conflicts_with = "connection_string")]
    pub id: Option<i64>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}

impl QueryArgs {
    pub fn to_request(&self) -> RunQueryRequest {
        RunQueryRequest {
            sql: self.sql.clone(),
            table_name: self.table.clone(),
            refresh: self.refresh,
        }
    }
}

impl RefreshArgs {
    pub fn to_request(&self) -> RefreshCacheRequest {
        RefreshCacheRequest {
            table_name: self.table.clone(),
            sql: self.sql.clone(),
        }
    }
}

impl TestConnectionArgs {
    /// Builds the request, parsing the connection string if one was given.
    pub fn to_request(&self) -> Result<TestConnectionRequest> {
        if let Some(id) = self.id {
            return Ok(TestConnectionRequest {
                data_source_id: Some(id),
                ..Default::default()
            });
        }

        let config = match &self.connection_string {
            Some(conn_str) => DataSourceConfig::from_connection_string(conn_str)?,
            None => DataSourceConfig::default(),
        };
        Ok(TestConnectionRequest {
            data_source_id: None,
            db_type: Some(config.kind.to_string()),
            config: Some(config),
        })
    }
}
