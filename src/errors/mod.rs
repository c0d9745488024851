//! # Error Handling
//!
//! Error handling for the meshplane generation core.

pub mod types;

pub use types::{MeshplaneError, Result};

/// Short alias used throughout the crate
pub type Error = MeshplaneError;
