//! HTTP API handlers for akira-rt

pub mod health;
pub mod output;
pub mod retune_workflow;
pub mod sse;
pub mod ui;
pub mod upload;

pub use health::health_routes;
pub use output::output_routes;
pub use retune_workflow::job_routes;
pub use sse::event_stream;
pub use ui::ui_routes;
pub use upload::upload_routes;
