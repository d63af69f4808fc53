use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run `analyze` on audio transcripts and attach it to the result metadata.
    pub analyze_transcripts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analyze_transcripts: true,
        }
    }
}
