use std::sync::Arc;

use secrecy::{ExposeSecret, Secret};

use candidate_assessment::adapters::gateway::HttpAnalysisGateway;
use candidate_assessment::adapters::storage::FileSessionStore;
use candidate_assessment::application::{AssessmentOrchestrator, GetReportHandler, SessionStatus};
use candidate_assessment::config::{AppConfig, TelemetryConfig};

const USAGE: &str = "usage: candidate-assessment [status|report|reset]";

fn init_tracing(telemetry: &TelemetryConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(telemetry.env_filter())
        .with_target(false)
        .with_writer(std::io::stderr);

    if telemetry.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let command = std::env::args().nth(1).unwrap_or_else(|| "status".to_string());
    if !matches!(command.as_str(), "status" | "report" | "reset") {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.telemetry);

    let mut store = FileSessionStore::new(&config.storage.session_dir);
    if let Some(token) = &config.gateway.api_token {
        store = store.with_credential(Secret::new(token.expose_secret().clone()));
    }
    let store = Arc::new(store);

    let orchestrator =
        AssessmentOrchestrator::start(store.clone(), config.assessment.settings()).await?;

    match command.as_str() {
        "reset" => {
            orchestrator.discard().await?;
            tracing::info!("Session reset");
        }
        "report" => {
            let gateway = Arc::new(HttpAnalysisGateway::new(config.http_gateway())?);
            let report = GetReportHandler::new(gateway).handle(&orchestrator).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        _ => {}
    }

    let status = SessionStatus::from_session(&orchestrator.snapshot().await);
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
