//! Response backends: analysis, reply post-processing and direct generation.
//!
//! Two interchangeable implementations share one record envelope. The
//! orchestrator binds to `Arc<dyn ResponseBackend>` and never learns which
//! one it holds.

mod extract;
mod live;
mod mock;
mod types;

pub use extract::extract_content;
pub use live::LiveBackend;
pub use mock::MockBackend;
pub use types::{
    Analysis, BackendMetadata, BackendRecord, BackendStatus, Generated, GenerationContext,
    ProcessedContent, Sentiment,
};

use chrono::{Local, SecondsFormat};
use std::sync::Arc;

use crate::config::BackendSelection;
use crate::orchestrator::traits::ResponseBackend;

const SESSION_ID_FORMAT: &str = "%Y%m%d%H%M%S";

/// Session identifiers are minted once per backend instance, not per request.
pub(crate) fn new_session_id() -> String {
    Local::now().format(SESSION_ID_FORMAT).to_string()
}

pub(crate) fn timestamp_now() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub fn build_backend(selection: &BackendSelection) -> Arc<dyn ResponseBackend> {
    match selection {
        BackendSelection::Mock => Arc::new(MockBackend::new()),
        BackendSelection::Live(config) => Arc::new(LiveBackend::new(config)),
    }
}
