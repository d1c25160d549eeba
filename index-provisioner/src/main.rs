//! Index Provisioner Main Entry Point
//!
//! Provisions the todos index in OpenSearch, then stores, fetches and
//! searches a todo document.

use dotenv::dotenv;
use index_provisioner::{run_todo_demo, AppError, Dependencies, Settings};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("index_provisioner=info,index_provisioner_repository=info")
    });

    let json_output = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| AppError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "index-provisioner",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| AppError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "index-provisioner",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting index provisioner");

    let settings = Settings::from_env()?;

    let deps = match Dependencies::new(settings).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let index = deps.settings.index_name.clone();
    match run_todo_demo(&deps.service, &deps.locks, index, deps.settings.reset_index).await {
        Ok(report) => {
            info!(
                stored = ?report.stored,
                round_trip_ok = report.fetched == report.stored,
                matches = ?report.matches,
                "Todo flow completed successfully"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Todo flow failed");
            Err(e)
        }
    }
}
