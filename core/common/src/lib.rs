//! Common utilities and types shared across StreamCrypt crates.
//!
//! This module provides the error taxonomy, the runtime configuration of the
//! streaming engine and a few foundational types used throughout the codebase.

pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use types::{Direction, SensitiveBytes};
