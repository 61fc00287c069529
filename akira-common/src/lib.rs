//! # AKIRA Common Library
//!
//! Shared code for the AKIRA retuner service:
//! - Event types (AkiraEvent enum) and the broadcast EventBus
//! - Configuration loading and root folder resolution
//! - Common error type
//! - Time formatting helpers for progress reporting

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
