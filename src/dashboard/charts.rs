//! Chart series synthesized from stats and recent activity

use chrono::{DateTime, Datelike, Days, Utc};
use rand::Rng;

use super::model::{
    ActivityEvent, ActivityTypeCount, ChartData, RevenuePoint, Stats, UserGrowthPoint,
};
use crate::types::{ApiError, Result};

pub const REVENUE_DAYS: u64 = 7;
pub const GROWTH_MONTHS: u32 = 6;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Daily revenue for the last 7 days, oldest first.
///
/// Each day is the monthly revenue spread over 30 days, varied by ±30%.
pub fn revenue_series<R: Rng + ?Sized>(
    monthly_revenue: u64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Vec<RevenuePoint>> {
    let today = now.date_naive();
    let daily = monthly_revenue as f64 / 30.0;

    (0..REVENUE_DAYS)
        .rev()
        .map(|days_ago| {
            let day = today.checked_sub_days(Days::new(days_ago)).ok_or_else(|| {
                ApiError::Internal(format!("date out of range: {} - {} days", today, days_ago))
            })?;
            let variation: f64 = rng.gen_range(0.7..1.3);
            Ok(RevenuePoint {
                day: day.format("%a").to_string(),
                revenue: (daily * variation).round() as i64,
            })
        })
        .collect()
}

/// User counts for the last 6 months, oldest first.
///
/// Each month back shrinks the current count by 10%, varied by ±10%.
pub fn user_growth_series<R: Rng + ?Sized>(
    current_users: u64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<UserGrowthPoint> {
    let month0 = now.month0();

    (0..GROWTH_MONTHS)
        .rev()
        .map(|months_ago| {
            let index = (month0 + 12 - months_ago) % 12;
            let trend = 1.0 - 0.1 * months_ago as f64;
            let variation: f64 = rng.gen_range(0.9..1.1);
            UserGrowthPoint {
                month: MONTH_LABELS[index as usize].to_string(),
                users: (current_users as f64 * trend * variation).round() as i64,
            }
        })
        .collect()
}

/// Count events per type, in order of first appearance
pub fn activity_by_type(events: &[ActivityEvent]) -> Vec<ActivityTypeCount> {
    let mut counts: Vec<ActivityTypeCount> = Vec::new();

    for event in events {
        let label = event.kind.chart_label();
        match counts.iter_mut().find(|c| c.label == label) {
            Some(entry) => entry.count += 1,
            None => counts.push(ActivityTypeCount {
                label: label.to_string(),
                count: 1,
            }),
        }
    }

    counts
}

pub fn build_chart_data<R: Rng + ?Sized>(
    stats: &Stats,
    activity: &[ActivityEvent],
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<ChartData> {
    Ok(ChartData {
        revenue: revenue_series(stats.revenue, now, rng)?,
        users: user_growth_series(stats.users, now, rng),
        activity_by_type: activity_by_type(activity),
    })
}

/// Complete chart set served when synthesis fails
pub fn fallback_chart_data() -> ChartData {
    let revenue = [
        ("Sun", 2500),
        ("Mon", 3200),
        ("Tue", 2800),
        ("Wed", 3500),
        ("Thu", 3100),
        ("Fri", 3800),
        ("Sat", 4200),
    ];
    let users = [
        ("Dec", 800),
        ("Jan", 900),
        ("Feb", 950),
        ("Mar", 1050),
        ("Apr", 1150),
        ("May", 1250),
    ];
    let activity = [("Orders", 4), ("Signups", 2), ("Reviews", 2)];

    ChartData {
        revenue: revenue
            .iter()
            .map(|(day, revenue)| RevenuePoint {
                day: day.to_string(),
                revenue: *revenue,
            })
            .collect(),
        users: users
            .iter()
            .map(|(month, users)| UserGrowthPoint {
                month: month.to_string(),
                users: *users,
            })
            .collect(),
        activity_by_type: activity
            .iter()
            .map(|(label, count)| ActivityTypeCount {
                label: label.to_string(),
                count: *count,
            })
            .collect(),
    }
}
