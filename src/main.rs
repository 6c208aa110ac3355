/// Workflow designer server
///
/// Serves the editing API:
/// - Toolbox catalog at /api/catalog
/// - Editing sessions at /api/sessions/*
/// - Saved workflows at /api/workflows/*
/// - Health check at /healthz

use workflow_designer::{config::Config, server::start_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
