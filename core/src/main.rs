use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use asurada_core::audio::AudioArtifact;
use asurada_core::config::AppConfig;
use asurada_core::orchestrator::{PipelineOrchestrator, PipelineRequest};
use asurada_core::server::{self, AppState};
use asurada_core::telemetry::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "asurada", version, about = "Voice and text assistant pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single request through the pipeline and print the result.
    Run {
        #[arg(long, conflicts_with = "audio")]
        text: Option<String>,
        #[arg(long)]
        audio: Option<PathBuf>,
        /// Answer with the response backend only, skipping the external assistant.
        #[arg(long)]
        direct: bool,
    },
    /// Start the HTTP API.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let _log_guard = init_tracing(&config.telemetry)?;
    info!(
        target: "asurada",
        backend = config.backend.as_str(),
        "configuration loaded"
    );

    let orchestrator = PipelineOrchestrator::from_config(&config);

    match cli.command {
        Command::Run {
            text,
            audio,
            direct,
        } => {
            let delegate = !direct;
            let request = match (text, audio) {
                (Some(text), _) => PipelineRequest::text(text, delegate),
                (None, Some(path)) => {
                    PipelineRequest::audio(AudioArtifact::from_path(path), delegate)
                }
                (None, None) => PipelineRequest::empty(delegate),
            };
            let result = orchestrator.run(request).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let state = AppState::new(Arc::new(orchestrator), config.server.upload_dir.clone());
            server::serve(state, port).await?;
        }
    }

    Ok(())
}
