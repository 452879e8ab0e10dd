//! Response types for the dashboard API

use serde::Serialize;

/// Headline business metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub users: u64,
    pub revenue: u64,
    pub orders: u64,
    pub visitors: u64,
}

/// Variant-specific part of an activity event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActivityKind {
    Signup,
    Order { amount: f64 },
    Review { rating: u8 },
}

impl ActivityKind {
    /// Label used in the `type` field
    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::Signup => "signup",
            ActivityKind::Order { .. } => "order",
            ActivityKind::Review { .. } => "review",
        }
    }

    /// Label used in the activity-by-type chart
    pub fn chart_label(&self) -> &'static str {
        match self {
            ActivityKind::Signup => "Signups",
            ActivityKind::Order { .. } => "Orders",
            ActivityKind::Review { .. } => "Reviews",
        }
    }
}

/// One entry in the recent-activity feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    pub id: String,
    #[serde(flatten)]
    pub kind: ActivityKind,
    pub user: String,
    /// Relative time, e.g. "25 minutes ago"
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenuePoint {
    pub day: String,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserGrowthPoint {
    pub month: String,
    pub users: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityTypeCount {
    #[serde(rename = "type")]
    pub label: String,
    pub count: usize,
}

/// Chart series for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    /// Daily revenue for the last 7 days, oldest first
    pub revenue: Vec<RevenuePoint>,
    /// Users for the last 6 months, oldest first
    pub users: Vec<UserGrowthPoint>,
    pub activity_by_type: Vec<ActivityTypeCount>,
}

/// Combined dashboard payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub stats: Stats,
    pub recent_activity: Vec<ActivityEvent>,
    pub chart_data: ChartData,
}
