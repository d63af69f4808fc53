use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::orchestrator::PipelineOrchestrator;

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<PipelineOrchestrator>,
    upload_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new<P: Into<PathBuf>>(orchestrator: Arc<PipelineOrchestrator>, upload_dir: P) -> Self {
        Self {
            orchestrator,
            upload_dir: Arc::new(upload_dir.into()),
        }
    }

    pub fn orchestrator(&self) -> &PipelineOrchestrator {
        &self.orchestrator
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }
}
