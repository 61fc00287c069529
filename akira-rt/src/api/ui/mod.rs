//! UI Routes - HTML pages for the akira-rt web interface
//!
//! Web UI with HTML/CSS/JS (vanilla ES6+, no frameworks):
//!
//! - **Root Page** (`root`): product landing page
//! - **Upload Page** (`upload_page`): drag-and-drop upload with live
//!   SSE progress
//! - **Output Page** (`output_page`): source/retuned comparison player

use crate::AppState;
use axum::{routing::get, Router};

mod output_page;
mod root;
mod upload_page;

use output_page::output_page;
use root::root_page;
pub use upload_page::upload_page;

/// Build UI routes
///
/// GET /upload lives with the POST handler in [`crate::api::upload`]
/// so both methods share one route entry.
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_page))
        .route("/output/:session_id", get(output_page))
}
