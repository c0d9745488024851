//! # Observability Infrastructure
//!
//! Structured logging for the meshplane generation core.

pub mod logging;

pub use logging::init_logging;
