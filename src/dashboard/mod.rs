//! Dashboard service
//!
//! Aggregates data from the third-party data API into business stats, a
//! recent-activity feed and chart series. Every upstream failure is absorbed
//! by a static fallback, so the dashboard keeps rendering when the data API
//! is down.
//!
//! ```text
//! GET /api/dashboard ─┬─ stats ──────────── GET /user?limit=1
//!                     ├─ activity(8) ─────┬ GET /user, /post, /comment
//!                     └─ charts ─┬ stats  │
//!                                └ activity(20)
//! ```

pub mod activity;
pub mod charts;
pub mod model;
pub mod service;
pub mod source;
pub mod stats;

pub use model::{
    ActivityEvent, ActivityKind, ActivityTypeCount, ChartData, DashboardData, RevenuePoint,
    Stats, UserGrowthPoint,
};
pub use service::DashboardService;
pub use source::{DataApiClient, DataSource, UpstreamError};
