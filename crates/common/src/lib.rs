//! povtrim Common Utilities
//!
//! Shared infrastructure for all povtrim crates:
//! - Error taxonomy and result aliases
//! - Clock utilities for recording synchronization
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
