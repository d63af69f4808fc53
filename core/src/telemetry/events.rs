use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) const TARGET: &str = "telemetry::pipeline";
pub(crate) const EVENT_OUTCOME: &str = "pipeline_outcome";

#[derive(Debug, Serialize)]
pub struct PipelineOutcomeEvent {
    pub mode: &'static str,
    pub input: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<&'static str>,
    pub latency_ms: u64,
}

pub fn record_pipeline_outcome(
    mode: &'static str,
    input: &'static str,
    status: &'static str,
    failed_stage: Option<&'static str>,
    latency: Duration,
) {
    let event = PipelineOutcomeEvent {
        mode,
        input,
        status,
        failed_stage,
        latency_ms: duration_to_ms(latency),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_OUTCOME,
            mode = event.mode,
            input = event.input,
            status = event.status,
            failed_stage = event.failed_stage.unwrap_or("none"),
            latency_ms = event.latency_ms,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_OUTCOME,
            %err,
            "failed to encode pipeline outcome event"
        ),
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
