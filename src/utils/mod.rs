//! Shared utilities
//!
//! Error handling and input validation helpers.

pub mod errors;
pub mod validation;

pub use errors::{AppError, AppResult};
