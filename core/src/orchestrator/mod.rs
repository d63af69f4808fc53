//! Request pipeline orchestration.

mod constants;
mod engine;
mod error;

pub mod config;
pub mod traits;
pub mod types;

pub use config::PipelineConfig;
pub use engine::PipelineOrchestrator;
pub use error::PipelineError;
pub use traits::{AudioNormalizer, QueryClient, ResponseBackend, SpeechEngine};
pub use types::{
    PipelineInput, PipelineMetadata, PipelineMode, PipelineRequest, PipelineResult,
    PipelineStatus, Stage,
};
