//! Core utilities for the presentation engine.
//!
//! This crate provides foundational types used across the workspace:
//! - Error types and result aliases
//! - Logging initialization

mod error;
mod logging;

pub use error::{Error, Result};
pub use logging::init_logging;
