//! Shared types for the backend

pub mod error;

pub use error::{ApiError, Result};
