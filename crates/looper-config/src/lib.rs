//! # Looper Config
//!
//! TOML configuration for the `looper` binary: run loop settings, logging,
//! and the timers and event sources to drive.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
