//! flow-reports - safe read-only queries against registered data sources.

mod cli;

use cli::{Cli, Command};
use flow_reports::api::{ApiResponse, GenerateSqlRequest, QueryService};
use flow_reports::config::Config;
use flow_reports::error::{EngineError, Result};
use flow_reports::logging;
use serde::Serialize;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    match &cli.log_file {
        Some(path) => logging::init_file_logging(path),
        None => logging::init_stderr_logging(),
    }

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    }
}

/// Runs one command. Returns whether the response was a success.
async fn run(cli: Cli) -> Result<bool> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_overrides();

    let service = QueryService::open(&config).await?;
    let owner = cli.owner.as_str();

    match cli.command {
        Command::Schema { id } => emit(service.schema(owner, id).await),
        Command::Query(args) => emit(service.run_query(owner, args.id, &args.to_request()).await),
        Command::RefreshCache(args) => {
            emit(service.refresh_cache(owner, args.id, &args.to_request()).await)
        }
        Command::TestConnection(args) => {
            let request = args.to_request()?;
            emit(service.test_connection(owner, &request).await)
        }
        Command::Generate { id, question } => {
            let request = GenerateSqlRequest {
                natural_language: question,
            };
            emit(service.generate_sql(owner, id, &request).await)
        }
        Command::Show { id } => emit(service.data_source(owner, id).await),
    }
}

/// Prints the response body as JSON on stdout.
fn emit<T: Serialize>(response: ApiResponse<T>) -> Result<bool> {
    let json = serde_json::to_string_pretty(&response.body)
        .map_err(|e| EngineError::internal(format!("Failed to encode response: {e}")))?;
    println!("{json}");
    if !response.is_success() {
        info!("Request finished with status {}", response.status);
    }
    Ok(response.is_success())
}
