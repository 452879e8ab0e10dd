//! Windsurf backend
//!
//! Two services behind one process and one bearer-token check:
//!
//! - **Calculator**: basic arithmetic with a bounded in-memory history
//! - **Dashboard**: stats, recent activity and chart series synthesized from
//!   a third-party data API, with static fallbacks when it is unavailable
//!
//! Tokens are RS256 JWTs verified against the identity provider's published
//! key set. `AuthMode::Bypass` lets unauthenticated requests through for local
//! development.

pub mod auth;
pub mod calculator;
pub mod config;
pub mod dashboard;
pub mod logging;
pub mod routes;
pub mod server;
pub mod types;

pub use config::{Args, AuthMode};
pub use server::{run, AppState};
pub use types::{ApiError, Result};
