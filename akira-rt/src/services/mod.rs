//! Business logic services for akira-rt

pub mod ffmpeg_client;
pub mod intake;
pub mod workflow_orchestrator;

pub use ffmpeg_client::{FfmpegClient, FfmpegError};
pub use workflow_orchestrator::WorkflowOrchestrator;
